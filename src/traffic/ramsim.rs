use std::io::Read;

use crate::base::mem::MemorySystem;
use crate::timeq::Cycle;
use crate::traffic::binary_trace::BinaryTraceReader;
use crate::traffic::config::TrafficConfig;
use crate::traffic::driver::{CpuBase, Driver};
use crate::traffic::error::TraceError;
use crate::traffic::logging::TrafficLogger;
use crate::traffic::pending::{ClockRatio, PendingQueue};

/// Replays a binary dependency trace.
///
/// Requests are held in a bounded pending set until every fragment has been admitted; a request
/// becomes eligible once none of its dependencies are pending and its delay, converted into
/// memory cycles, has elapsed.
pub struct RamSimCpu<M, R> {
    base: CpuBase<M>,
    trace: BinaryTraceReader<R>,
    pending: PendingQueue,
    reported_done: bool,
}

impl<M: MemorySystem, R: Read> RamSimCpu<M, R> {
    pub fn new(memory: M, trace: BinaryTraceReader<R>, config: &TrafficConfig) -> Self {
        TrafficLogger::log_clock_ratios(config.cpu_clock_ratio, config.mem_clock_ratio);
        let ratio = ClockRatio::new(config.cpu_clock_ratio, config.mem_clock_ratio);
        Self {
            base: CpuBase::new(memory),
            trace,
            pending: PendingQueue::new(config.max_pending, ratio),
            reported_done: false,
        }
    }

    pub fn memory(&self) -> &M {
        &self.base.memory
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }
}

impl<M: MemorySystem, R: Read> Driver for RamSimCpu<M, R> {
    fn clock_tick(&mut self) -> Result<(), TraceError> {
        let now = self.base.clk;
        self.base.memory.clock_tick();
        self.pending.refill(&mut self.trace, now)?;
        self.pending.evict_completed(now);
        self.pending.issue(&mut self.base.memory, now);
        self.base.clk += 1;

        if !self.reported_done && self.pending.is_drained() {
            self.reported_done = true;
            TrafficLogger::log_done(now, self.pending.stats().requests_completed);
        }
        Ok(())
    }

    fn finished(&self) -> bool {
        self.pending.is_drained()
    }

    fn print_stats(&mut self) {
        self.base.print_stats();
    }

    fn cycle(&self) -> Cycle {
        self.base.clk
    }
}
