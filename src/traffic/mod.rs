pub mod binary_trace;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod pending;
pub mod ramsim;
pub mod random;
pub mod stream;
pub mod text_trace;
pub mod trace_cpu;
pub mod types;

#[cfg(test)]
mod unit_tests;

pub use driver::{CpuBase, Driver};
pub use error::TraceError;
pub use types::{MemRequest, OpType, Transaction};
