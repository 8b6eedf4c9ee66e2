use std::io::BufRead;

use log::info;

use crate::base::mem::MemorySystem;
use crate::timeq::Cycle;
use crate::traffic::driver::{CpuBase, Driver};
use crate::traffic::error::TraceError;
use crate::traffic::text_trace::TextTraceReader;
use crate::traffic::types::Transaction;

/// Replays a text trace, issuing each transaction no earlier than its recorded cycle.
///
/// Holds at most one transaction; the next line is read only after the held one is admitted.
pub struct TraceCpu<M, R> {
    base: CpuBase<M>,
    trace: TextTraceReader<R>,
    held: Option<Transaction>,
    exhausted: bool,
}

impl<M: MemorySystem, R: BufRead> TraceCpu<M, R> {
    pub fn new(memory: M, trace: TextTraceReader<R>) -> Self {
        Self {
            base: CpuBase::new(memory),
            trace,
            held: None,
            exhausted: false,
        }
    }

    pub fn memory(&self) -> &M {
        &self.base.memory
    }

    pub fn held(&self) -> Option<Transaction> {
        self.held
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl<M: MemorySystem, R: BufRead> Driver for TraceCpu<M, R> {
    fn clock_tick(&mut self) -> Result<(), TraceError> {
        self.base.memory.clock_tick();
        loop {
            let trans = match self.held {
                Some(trans) => trans,
                None if self.exhausted => break,
                None => match self.trace.next_transaction()? {
                    Some(trans) => {
                        self.held = Some(trans);
                        trans
                    }
                    None => {
                        info!("text trace exhausted at cycle {}", self.base.clk);
                        self.exhausted = true;
                        break;
                    }
                },
            };
            if trans.added_cycle > self.base.clk {
                break;
            }
            if !self.base.memory.try_add(trans.addr, trans.is_write) {
                break;
            }
            self.held = None;
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
