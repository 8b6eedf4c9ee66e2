use log::info;

use crate::timeq::Cycle;
use crate::traffic::types::MemRequest;

/// Records between two progress lines of a dependency-trace replay.
pub const PROGRESS_INTERVAL: u64 = 10000;

pub struct TrafficLogger;

impl TrafficLogger {
    pub fn log_record(req: &MemRequest, cycle: Cycle) {
        if req.id % PROGRESS_INTERVAL == 0 {
            info!("[TRAFFIC] {} (clk {})", req, cycle);
        }
    }

    pub fn log_clock_ratios(cpu_clock_ratio: u64, mem_clock_ratio: u64) {
        info!(
            "[TRAFFIC] cpu_clock_ratio: {}, mem_clock_ratio: {}",
            cpu_clock_ratio, mem_clock_ratio
        );
    }

    pub fn log_done(cycle: Cycle, completed: u64) {
        info!(
            "[TRAFFIC] all {} requests done at cycle {:>10}",
            completed, cycle
        );
    }
}
