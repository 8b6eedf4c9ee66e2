use std::cell::RefCell;
use std::io::Cursor;

use crate::base::mem::MemorySystem;
use crate::timeq::Cycle;
use crate::traffic::binary_trace::{BinaryTraceReader, BinaryTraceWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offer {
    pub cycle: Cycle,
    pub addr: u64,
    pub is_write: bool,
}

type AcceptFn = Box<dyn Fn(Cycle, u64, bool) -> bool>;

/// Memory double that answers admission through a predicate of (driver cycle, addr, is_write)
/// and records every query and admitted transaction.
pub struct ScriptedMemory {
    ticks: u64,
    accept: AcceptFn,
    pub queries: RefCell<Vec<Offer>>,
    pub added: Vec<Offer>,
    pub stats_printed: bool,
}

impl ScriptedMemory {
    pub fn new(accept: impl Fn(Cycle, u64, bool) -> bool + 'static) -> Self {
        Self {
            ticks: 0,
            accept: Box::new(accept),
            queries: RefCell::new(Vec::new()),
            added: Vec::new(),
            stats_printed: false,
        }
    }

    pub fn always() -> Self {
        Self::new(|_, _, _| true)
    }

    pub fn never() -> Self {
        Self::new(|_, _, _| false)
    }

    /// Cycle of the driver tick that last ticked this memory.
    pub fn now(&self) -> Cycle {
        self.ticks.saturating_sub(1)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn added_at(&self, cycle: Cycle) -> Vec<u64> {
        self.added
            .iter()
            .filter(|offer| offer.cycle == cycle)
            .map(|offer| offer.addr)
            .collect()
    }

    pub fn queried_at(&self, cycle: Cycle) -> Vec<u64> {
        self.queries
            .borrow()
            .iter()
            .filter(|offer| offer.cycle == cycle)
            .map(|offer| offer.addr)
            .collect()
    }
}

impl MemorySystem for ScriptedMemory {
    fn clock_tick(&mut self) {
        self.ticks += 1;
    }

    fn will_accept(&self, addr: u64, is_write: bool) -> bool {
        let cycle = self.now();
        self.queries.borrow_mut().push(Offer {
            cycle,
            addr,
            is_write,
        });
        (self.accept)(cycle, addr, is_write)
    }

    fn add_transaction(&mut self, addr: u64, is_write: bool) {
        let cycle = self.now();
        let last = self.queries.borrow().last().copied();
        assert_eq!(
            last,
            Some(Offer {
                cycle,
                addr,
                is_write
            }),
            "add_transaction without a matching admission query"
        );
        self.added.push(Offer {
            cycle,
            addr,
            is_write,
        });
    }

    fn print_stats(&mut self) {
        self.stats_printed = true;
    }
}

/// (addr, op_type, delay, size, deps) per record, ids assigned in order.
pub type RecordSpec<'a> = (u64, u64, u64, u64, &'a [u64]);

pub fn trace_bytes(records: &[RecordSpec]) -> Vec<u8> {
    let mut writer = BinaryTraceWriter::new(Vec::new()).unwrap();
    for &(addr, op_type, delay, size, deps) in records {
        writer.append(addr, op_type, delay, size, deps).unwrap();
    }
    writer.finish().unwrap()
}

pub fn trace_reader(records: &[RecordSpec]) -> BinaryTraceReader<Cursor<Vec<u8>>> {
    BinaryTraceReader::new(Cursor::new(trace_bytes(records))).unwrap()
}
