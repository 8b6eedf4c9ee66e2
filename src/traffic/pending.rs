//! Dependency resolution and fragment issue for dependency traces.
//!
//! Each tick runs two passes over the pending set. The first evicts requests whose fragments
//! have all been admitted and, if anything left, rescans the unresolved requests once. The second
//! offers fragments of every eligible request to the memory model in ascending offset order,
//! stopping at the first rejected fragment of each request.

use std::collections::HashSet;
use std::io::Read;

use log::{debug, info};

use crate::base::mem::MemorySystem;
use crate::timeq::Cycle;
use crate::traffic::binary_trace::BinaryTraceReader;
use crate::traffic::error::TraceError;
use crate::traffic::logging::TrafficLogger;
use crate::traffic::types::MemRequest;

/// Converts delays from the driver's clock domain into memory-model cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRatio {
    cpu: u64,
    mem: u64,
}

impl ClockRatio {
    pub fn new(cpu: u64, mem: u64) -> Self {
        assert!(cpu > 0 && mem > 0, "clock ratios must be positive");
        Self { cpu, mem }
    }

    /// `delay / cpu * mem`, rounded up so a request is never issued early.
    pub fn to_mem_cycles(&self, delay: u64) -> Cycle {
        let scaled = (delay as u128 * self.mem as u128).div_ceil(self.cpu as u128);
        u64::try_from(scaled).unwrap_or(Cycle::MAX)
    }
}

impl Default for ClockRatio {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PendingStats {
    pub records_read: u64,
    pub requests_completed: u64,
    pub chunks_issued: u64,
    pub chunks_rejected: u64,
}

#[derive(Debug)]
pub struct PendingQueue {
    entries: Vec<MemRequest>,
    ids: HashSet<u64>,
    max_pending: usize,
    ratio: ClockRatio,
    exhausted: bool,
    stats: PendingStats,
}

impl PendingQueue {
    pub fn new(max_pending: usize, ratio: ClockRatio) -> Self {
        assert!(max_pending > 0, "max_pending must be > 0");
        Self {
            entries: Vec::with_capacity(max_pending),
            ids: HashSet::with_capacity(max_pending),
            max_pending,
            ratio,
            exhausted: false,
            stats: PendingStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_pending
    }

    pub fn capacity(&self) -> usize {
        self.max_pending
    }

    /// Whether the trace source has reported a clean end of stream.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Source exhausted and nothing left in flight.
    pub fn is_drained(&self) -> bool {
        self.exhausted && self.entries.is_empty()
    }

    pub fn stats(&self) -> PendingStats {
        self.stats
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemRequest> {
        self.entries.iter()
    }

    pub fn get(&self, id: u64) -> Option<&MemRequest> {
        self.entries.iter().find(|req| req.id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    /// Track a new request, resolving it at once if none of its dependencies are pending.
    pub fn push(&mut self, mut req: MemRequest, now: Cycle) {
        req.min_issue_cycle = if deps_solved(&self.ids, &req) {
            Some(now.saturating_add(self.ratio.to_mem_cycles(req.delay)))
        } else {
            None
        };
        self.ids.insert(req.id);
        self.entries.push(req);
    }

    /// Pull records until the pending set is full or the trace ends. Returns how many were read.
    pub fn refill<R: Read>(
        &mut self,
        reader: &mut BinaryTraceReader<R>,
        now: Cycle,
    ) -> Result<usize, TraceError> {
        let mut pulled = 0;
        while !self.exhausted && !self.is_full() {
            match reader.next_record()? {
                Some(req) => {
                    self.push(req, now);
                    pulled += 1;
                    self.stats.records_read += 1;
                    if let Some(req) = self.entries.last() {
                        TrafficLogger::log_record(req, now);
                    }
                }
                None => {
                    info!(
                        "trace exhausted after {} records at cycle {}",
                        self.stats.records_read, now
                    );
                    self.exhausted = true;
                }
            }
        }
        Ok(pulled)
    }

    /// First pass: drop fully admitted requests, then resolve dependents they were blocking.
    /// Returns the number of evicted requests.
    pub fn evict_completed(&mut self, now: Cycle) -> usize {
        let before = self.entries.len();
        let ids = &mut self.ids;
        self.entries.retain(|req| {
            if req.is_complete() {
                ids.remove(&req.id);
                false
            } else {
                true
            }
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            self.stats.requests_completed += evicted as u64;
            self.resolve_unblocked(now);
        }
        evicted
    }

    /// Second pass: offer fragments of every eligible request. Returns the number admitted.
    pub fn issue<M: MemorySystem>(&mut self, memory: &mut M, now: Cycle) -> usize {
        let mut admitted = 0;
        for req in self.entries.iter_mut().filter(|req| req.is_ready(now)) {
            let is_write = req.is_write();
            while let Some(offset) = req.next_chunk() {
                let addr = req.chunk_addr(offset);
                if !memory.try_add(addr, is_write) {
                    self.stats.chunks_rejected += 1;
                    break;
                }
                req.retire_chunk();
                admitted += 1;
            }
        }
        self.stats.chunks_issued += admitted as u64;
        admitted
    }

    fn resolve_unblocked(&mut self, now: Cycle) {
        let ids = &self.ids;
        let ratio = self.ratio;
        for req in self.entries.iter_mut().filter(|req| !req.is_resolved()) {
            if deps_solved(ids, req) {
                let cycle = now.saturating_add(ratio.to_mem_cycles(req.delay));
                debug!("request {} unblocked, min issue cycle {}", req.id, cycle);
                req.min_issue_cycle = Some(cycle);
            }
        }
    }
}

fn deps_solved(pending_ids: &HashSet<u64>, req: &MemRequest) -> bool {
    req.deps.iter().all(|dep| !pending_ids.contains(dep))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_ratio_rounds_up() {
        let ratio = ClockRatio::new(3, 2);
        assert_eq!(ratio.to_mem_cycles(0), 0);
        assert_eq!(ratio.to_mem_cycles(1), 1);
        assert_eq!(ratio.to_mem_cycles(3), 2);
        assert_eq!(ratio.to_mem_cycles(4), 3);
        assert_eq!(ClockRatio::new(2, 1).to_mem_cycles(5), 3);
    }

    #[test]
    fn push_resolves_only_unblocked_requests() {
        let mut queue = PendingQueue::new(4, ClockRatio::new(1, 2));
        queue.push(MemRequest::new(0, 0, 0, 3, 64, &[]), 10);
        queue.push(MemRequest::new(1, 0, 0, 3, 64, &[0]), 10);
        assert_eq!(queue.get(0).unwrap().min_issue_cycle, Some(16));
        assert_eq!(queue.get(1).unwrap().min_issue_cycle, None);
    }

    #[test]
    fn eviction_rescans_once_and_resolves_dependents() {
        let mut queue = PendingQueue::new(4, ClockRatio::default());
        queue.push(MemRequest::new(0, 0, 0, 0, 0, &[]), 0);
        queue.push(MemRequest::new(1, 0, 0, 2, 64, &[0]), 0);
        queue.push(MemRequest::new(2, 0, 0, 0, 64, &[0]), 0);
        assert_eq!(queue.evict_completed(5), 1);
        assert_eq!(queue.get(1).unwrap().min_issue_cycle, Some(7));
        assert_eq!(queue.get(2).unwrap().min_issue_cycle, Some(5));
        assert!(!queue.contains(0));
        assert_eq!(queue.stats().requests_completed, 1);
    }
}
