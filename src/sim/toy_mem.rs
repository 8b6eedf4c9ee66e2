use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;

use crate::base::mem::{Callback, MemorySystem};
use crate::sim::config::MemConfig;
use crate::timeq::{Cycle, ServerConfig, ServiceRequest, TimedServer};

#[derive(Debug, Clone, Copy)]
struct Pending {
    addr: u64,
    is_write: bool,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct MemStats {
    pub cycles: Cycle,
    pub reads_issued: u64,
    pub writes_issued: u64,
    pub reads_completed: u64,
    pub writes_completed: u64,
    pub total_latency: u64,
    pub max_occupancy: usize,
}

impl MemStats {
    pub fn avg_latency(&self) -> f64 {
        let done = self.reads_completed + self.writes_completed;
        if done == 0 {
            0.0
        } else {
            self.total_latency as f64 / done as f64
        }
    }
}

/// Bounded-queue stand-in for a memory-timing model: each channel is a [`TimedServer`] with a
/// fixed latency, bandwidth and queue depth. Transactions are steered by cache-line interleaving.
pub struct ToyMemorySystem {
    cycle: Cycle,
    config: MemConfig,
    channels: Vec<TimedServer<Pending>>,
    read_callback: Callback,
    write_callback: Callback,
    output_dir: PathBuf,
    stats: MemStats,
}

impl ToyMemorySystem {
    pub fn new(
        config: MemConfig,
        output_dir: &Path,
        read_callback: Callback,
        write_callback: Callback,
    ) -> Self {
        let server = ServerConfig {
            base_latency: config.base_latency,
            bytes_per_cycle: config.bytes_per_cycle.max(1),
            queue_capacity: config.queue_capacity.max(1),
        };
        let channels = (0..config.num_channels.max(1))
            .map(|_| TimedServer::new(server))
            .collect();
        Self {
            cycle: 0,
            config,
            channels,
            read_callback,
            write_callback,
            output_dir: output_dir.to_path_buf(),
            stats: MemStats::default(),
        }
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn stats(&self) -> &MemStats {
        &self.stats
    }

    pub fn outstanding(&self) -> usize {
        self.channels.iter().map(TimedServer::len).sum()
    }

    fn channel_of(&self, addr: u64) -> usize {
        let line = addr / self.config.line_bytes.max(1) as u64;
        (line % self.channels.len() as u64) as usize
    }

    fn write_stats(&self) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("cannot create output dir {}", self.output_dir.display())
        })?;
        let path = self.output_dir.join("stats.json");
        let file = fs::File::create(&path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &self.stats)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }
}

impl MemorySystem for ToyMemorySystem {
    fn clock_tick(&mut self) {
        self.cycle += 1;
        self.stats.cycles = self.cycle;
        let now = self.cycle;
        let stats = &mut self.stats;
        let read_cb = &mut self.read_callback;
        let write_cb = &mut self.write_callback;
        for channel in self.channels.iter_mut() {
            channel.service_ready(now, |done| {
                stats.total_latency += done.ticket.latency();
                if done.payload.is_write {
                    stats.writes_completed += 1;
                    write_cb(done.payload.addr);
                } else {
                    stats.reads_completed += 1;
                    read_cb(done.payload.addr);
                }
            });
        }
    }

    fn will_accept(&self, addr: u64, _is_write: bool) -> bool {
        self.channels[self.channel_of(addr)].can_enqueue(self.cycle)
    }

    fn add_transaction(&mut self, addr: u64, is_write: bool) {
        let channel = self.channel_of(addr);
        let request = ServiceRequest::new(Pending { addr, is_write }, self.config.line_bytes);
        if self.channels[channel].try_enqueue(self.cycle, request).is_err() {
            warn!(
                "transaction {:#x} added without admission at cycle {}, dropped",
                addr, self.cycle
            );
            return;
        }
        if is_write {
            self.stats.writes_issued += 1;
        } else {
            self.stats.reads_issued += 1;
        }
        self.stats.max_occupancy = self.stats.max_occupancy.max(self.outstanding());
    }

    fn print_stats(&mut self) {
        let s = &self.stats;
        info!(
            "cycles: {}, reads: {}/{}, writes: {}/{}, avg latency: {:.2}, max occupancy: {}",
            s.cycles,
            s.reads_completed,
            s.reads_issued,
            s.writes_completed,
            s.writes_issued,
            s.avg_latency(),
            s.max_occupancy
        );
        match self.write_stats() {
            Ok(path) => info!("stats written to {}", path.display()),
            Err(err) => warn!("failed to write stats: {:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn toy(queue_capacity: usize, base_latency: u64) -> ToyMemorySystem {
        let config = MemConfig {
            queue_capacity,
            base_latency,
            ..MemConfig::default()
        };
        ToyMemorySystem::new(
            config,
            Path::new("."),
            Box::new(|_| {}),
            Box::new(|_| {}),
        )
    }

    #[test]
    fn admission_follows_queue_depth() {
        let mut mem = toy(2, 4);
        mem.clock_tick();
        assert!(mem.try_add(0x0, false));
        assert!(mem.try_add(0x40, true));
        assert!(!mem.will_accept(0x80, false));
        assert_eq!(mem.outstanding(), 2);
    }

    #[test]
    fn completions_invoke_callbacks() {
        let reads = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reads);
        let mut mem = ToyMemorySystem::new(
            MemConfig {
                base_latency: 2,
                ..MemConfig::default()
            },
            Path::new("."),
            Box::new(move |addr| sink.borrow_mut().push(addr)),
            Box::new(|_| {}),
        );
        mem.clock_tick();
        assert!(mem.try_add(0x1000, false));
        for _ in 0..3 {
            mem.clock_tick();
        }
        assert_eq!(*reads.borrow(), vec![0x1000]);
        assert_eq!(mem.stats().reads_completed, 1);
        assert_eq!(mem.outstanding(), 0);
    }

    #[test]
    fn channels_interleave_on_cache_lines() {
        let config = MemConfig {
            num_channels: 2,
            queue_capacity: 1,
            ..MemConfig::default()
        };
        let mut mem = ToyMemorySystem::new(config, Path::new("."), Box::new(|_| {}), Box::new(|_| {}));
        assert!(mem.try_add(0x0, false));
        assert!(!mem.will_accept(0x80, false));
        assert!(mem.will_accept(0x40, false));
    }
}
