use std::fmt;
use std::ops::Range;

use smallvec::SmallVec;

use crate::timeq::Cycle;

/// Bytes covered by one fragment of a dependency-trace request.
pub const CHUNK_BYTES: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpType {
    #[default]
    Read,
    Write,
}

impl OpType {
    pub fn is_write(self) -> bool {
        matches!(self, Self::Write)
    }
}

impl From<u64> for OpType {
    fn from(raw: u64) -> Self {
        if raw == 0 {
            Self::Read
        } else {
            Self::Write
        }
    }
}

impl From<bool> for OpType {
    fn from(is_write: bool) -> Self {
        if is_write {
            Self::Write
        } else {
            Self::Read
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpType::Read => write!(f, "R"),
            OpType::Write => write!(f, "W"),
        }
    }
}

/// A single memory access offered by the synthetic and text-trace drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transaction {
    pub addr: u64,
    pub is_write: bool,
    pub added_cycle: Cycle,
}

impl Transaction {
    pub fn new(addr: u64, is_write: bool, added_cycle: Cycle) -> Self {
        Self {
            addr,
            is_write,
            added_cycle,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {:#x} @{}",
            OpType::from(self.is_write),
            self.addr,
            self.added_cycle
        )
    }
}

/// One record of a dependency trace, split into `CHUNK_BYTES` fragments.
///
/// Fragments are admitted front to back; `chunks` holds the offsets still waiting, so an empty
/// range means every fragment has been handed to the memory model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemRequest {
    pub id: u64,
    pub addr: u64,
    pub op_type: u64,
    pub delay: u64,
    pub size: u64,
    pub deps: SmallVec<[u64; 4]>,
    chunks: Range<u64>,
    /// `None` until every dependency has left the pending set.
    pub min_issue_cycle: Option<Cycle>,
}

impl MemRequest {
    pub fn new(id: u64, addr: u64, op_type: u64, delay: u64, size: u64, deps: &[u64]) -> Self {
        Self {
            id,
            addr,
            op_type,
            delay,
            size,
            deps: SmallVec::from_slice(deps),
            chunks: 0..num_chunks(size),
            min_issue_cycle: None,
        }
    }

    pub fn op(&self) -> OpType {
        OpType::from(self.op_type)
    }

    pub fn is_write(&self) -> bool {
        self.op().is_write()
    }

    pub fn is_complete(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_resolved(&self) -> bool {
        self.min_issue_cycle.is_some()
    }

    pub fn is_ready(&self, now: Cycle) -> bool {
        self.min_issue_cycle.is_some_and(|cycle| cycle <= now)
    }

    /// Offsets of the fragments not yet admitted, in the order they must be offered.
    pub fn chunk_offsets(&self) -> Range<u64> {
        self.chunks.clone()
    }

    pub fn remaining_chunks(&self) -> u64 {
        self.chunks.end - self.chunks.start
    }

    pub fn next_chunk(&self) -> Option<u64> {
        (!self.chunks.is_empty()).then_some(self.chunks.start)
    }

    pub fn chunk_addr(&self, offset: u64) -> u64 {
        self.addr.wrapping_add(offset.wrapping_mul(CHUNK_BYTES))
    }

    /// Drop the front fragment after the memory model admitted it.
    pub(crate) fn retire_chunk(&mut self) {
        if !self.chunks.is_empty() {
            self.chunks.start += 1;
        }
    }
}

impl fmt::Display for MemRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let min_issue = self
            .min_issue_cycle
            .map(|cycle| cycle.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "id: {}, addr: {:#x}, type: {}, delay: {}, size: {}, minIssue: {}, chunks: {}",
            self.id,
            self.addr,
            self.op(),
            self.delay,
            self.size,
            min_issue,
            self.remaining_chunks()
        )
    }
}

pub fn num_chunks(size: u64) -> u64 {
    size.div_ceil(CHUNK_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_split_into_cache_lines() {
        let req = MemRequest::new(0, 0x1000, 0, 0, 130, &[]);
        assert_eq!(req.chunk_offsets().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(req.chunk_addr(2), 0x1080);
        assert!(!req.is_complete());
    }

    #[test]
    fn exact_multiple_does_not_round_up() {
        assert_eq!(num_chunks(64), 1);
        assert_eq!(num_chunks(128), 2);
        assert_eq!(num_chunks(1), 1);
        assert_eq!(num_chunks(0), 0);
    }

    #[test]
    fn retiring_chunks_walks_front_to_back() {
        let mut req = MemRequest::new(3, 0, 1, 0, 128, &[1, 2]);
        assert!(req.is_write());
        assert_eq!(req.next_chunk(), Some(0));
        req.retire_chunk();
        assert_eq!(req.next_chunk(), Some(1));
        req.retire_chunk();
        assert_eq!(req.next_chunk(), None);
        assert!(req.is_complete());
    }

    #[test]
    fn op_type_nonzero_is_write() {
        assert_eq!(OpType::from(0), OpType::Read);
        assert_eq!(OpType::from(1), OpType::Write);
        assert_eq!(OpType::from(7), OpType::Write);
    }
}
