use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::base::mem::MemorySystem;
use crate::timeq::Cycle;
use crate::traffic::driver::{CpuBase, Driver};
use crate::traffic::error::TraceError;
use crate::traffic::types::Transaction;

/// Issues uniformly random addresses at full speed, about a third of them writes.
///
/// Useful for exercising bank-level parallelism independent of address mapping and locality.
pub struct RandomCpu<M> {
    base: CpuBase<M>,
    rng: StdRng,
    last: Transaction,
    get_next: bool,
}

impl<M: MemorySystem> RandomCpu<M> {
    pub fn new(memory: M, seed: u64) -> Self {
        Self {
            base: CpuBase::new(memory),
            rng: StdRng::seed_from_u64(seed),
            last: Transaction::default(),
            get_next: true,
        }
    }

    pub fn memory(&self) -> &M {
        &self.base.memory
    }

    /// The candidate currently being offered.
    pub fn candidate(&self) -> Transaction {
        self.last
    }
}

impl<M: MemorySystem> Driver for RandomCpu<M> {
    fn clock_tick(&mut self) -> Result<(), TraceError> {
        self.base.memory.clock_tick();
        if self.get_next {
            let addr = self.rng.gen::<u64>();
            let is_write = self.rng.gen_range(0..3) == 0;
            self.last = Transaction::new(addr, is_write, self.base.clk);
        }
        self.get_next = self.base.memory.try_add(self.last.addr, self.last.is_write);
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
