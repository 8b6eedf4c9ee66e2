pub mod config;
pub mod log;
pub mod toy_mem;
pub mod top;
