use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::base::mem::MemorySystem;
use crate::timeq::Cycle;
use crate::traffic::config::StreamConfig;
use crate::traffic::driver::{CpuBase, Driver};
use crate::traffic::error::TraceError;

/// Stream-add kernel: reads two arrays and writes their sum to a third, one stride per step.
///
/// Every third stream is the write target. The offset advances only once each stream's access
/// at the current offset has been admitted, and fresh random bases are drawn when it wraps.
pub struct StreamCpu<M> {
    base: CpuBase<M>,
    rng: StdRng,
    config: StreamConfig,
    offset: u64,
    addrs: Vec<u64>,
    inserted: Vec<bool>,
}

impl<M: MemorySystem> StreamCpu<M> {
    pub fn new(memory: M, config: StreamConfig, seed: u64) -> Self {
        let num_streams = config.num_streams.max(1);
        Self {
            base: CpuBase::new(memory),
            rng: StdRng::seed_from_u64(seed),
            config,
            offset: 0,
            addrs: vec![0; num_streams],
            inserted: vec![false; num_streams],
        }
    }

    pub fn memory(&self) -> &M {
        &self.base.memory
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn bases(&self) -> &[u64] {
        &self.addrs
    }

    fn is_write_stream(idx: usize) -> bool {
        idx % 3 == 2
    }
}

impl<M: MemorySystem> Driver for StreamCpu<M> {
    fn clock_tick(&mut self) -> Result<(), TraceError> {
        self.base.memory.clock_tick();
        if self.offset >= self.config.array_bytes || self.base.clk == 0 {
            for addr in self.addrs.iter_mut() {
                *addr = self.rng.gen();
            }
            self.offset = 0;
        }

        for (idx, (addr, inserted)) in self.addrs.iter().zip(self.inserted.iter_mut()).enumerate() {
            if !*inserted {
                let target = addr.wrapping_add(self.offset);
                *inserted = self.base.memory.try_add(target, Self::is_write_stream(idx));
            }
        }

        if self.inserted.iter().all(|&done| done) {
            self.offset += self.config.stride;
            self.inserted.fill(false);
        }
        self.base.clk += 1;
        Ok(())
    }

    fn print_stats(&mut self) {
        self.base.print_stats();
    }

    fn cycle(&self) -> Cycle {
        self.base.clk
    }
}
