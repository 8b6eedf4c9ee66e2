use crate::base::mem::MemorySystem;
use crate::timeq::Cycle;
use crate::traffic::error::TraceError;

/// Per-cycle contract shared by every traffic generator ("CPU").
pub trait Driver {
    /// Advance one cycle: tick the memory model, offer this cycle's transactions, then bump the
    /// cycle counter. An error means the trace input is corrupt and the run must stop.
    fn clock_tick(&mut self) -> Result<(), TraceError>;

    fn finished(&self) -> bool {
        false
    }

    fn print_stats(&mut self);

    fn cycle(&self) -> Cycle;
}

/// State every driver carries: the memory model it feeds and its own cycle counter.
#[derive(Debug)]
pub struct CpuBase<M> {
    pub memory: M,
    pub clk: Cycle,
}

impl<M: MemorySystem> CpuBase<M> {
    pub fn new(memory: M) -> Self {
        Self { memory, clk: 0 }
    }

    /// Read completions are accepted but not modeled.
    pub fn read_callback(_addr: u64) {}

    /// Write completions are accepted but not modeled.
    pub fn write_callback(_addr: u64) {}

    pub fn print_stats(&mut self) {
        self.memory.print_stats();
    }
}
