use anyhow::Context;
use log::{info, warn};

use crate::sim::config::{CpuKind, RunConfig};
use crate::sim::toy_mem::ToyMemorySystem;
use crate::timeq::Cycle;
use crate::traffic::binary_trace::BinaryTraceReader;
use crate::traffic::driver::{CpuBase, Driver};
use crate::traffic::ramsim::RamSimCpu;
use crate::traffic::random::RandomCpu;
use crate::traffic::stream::StreamCpu;
use crate::traffic::text_trace::TextTraceReader;
use crate::traffic::trace_cpu::TraceCpu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSummary {
    pub cycles: Cycle,
    pub finished: bool,
}

pub struct Sim {
    driver: Box<dyn Driver>,
    max_cycles: Cycle,
}

impl Sim {
    pub fn new(config: &RunConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::with_driver(build_driver(config)?, config.sim.cycles))
    }

    pub fn with_driver(driver: Box<dyn Driver>, max_cycles: Cycle) -> Self {
        Self { driver, max_cycles }
    }

    /// Tick the driver until it reports finished or the cycle budget runs out, then print stats.
    pub fn simulate(&mut self) -> anyhow::Result<SimSummary> {
        while self.driver.cycle() < self.max_cycles && !self.driver.finished() {
            let cycle = self.driver.cycle();
            self.driver
                .clock_tick()
                .with_context(|| format!("simulation aborted at cycle {}", cycle))?;
        }
        let summary = SimSummary {
            cycles: self.driver.cycle(),
            finished: self.driver.finished(),
        };
        if summary.finished {
            info!("driver finished after {} cycles", summary.cycles);
        } else {
            warn!("cycle limit {} reached before the driver finished", self.max_cycles);
        }
        self.driver.print_stats();
        Ok(summary)
    }
}

pub fn build_driver(config: &RunConfig) -> anyhow::Result<Box<dyn Driver>> {
    let memory = ToyMemorySystem::new(
        config.mem,
        &config.sim.output_dir,
        Box::new(CpuBase::<ToyMemorySystem>::read_callback),
        Box::new(CpuBase::<ToyMemorySystem>::write_callback),
    );
    let traffic = &config.traffic;
    let driver: Box<dyn Driver> = match config.sim.cpu {
        CpuKind::Random => Box::new(RandomCpu::new(memory, traffic.seed)),
        CpuKind::Stream => Box::new(StreamCpu::new(memory, traffic.stream.clone(), traffic.seed)),
        CpuKind::Trace => {
            let path = config.sim.trace_file.as_ref().context("no trace file configured")?;
            let trace = TextTraceReader::open(path)?;
            Box::new(TraceCpu::new(memory, trace))
        }
        CpuKind::DependencyTrace => {
            let path = config.sim.trace_file.as_ref().context("no trace file configured")?;
            let trace = BinaryTraceReader::open(path)?;
            Box::new(RamSimCpu::new(memory, trace, traffic))
        }
    };
    info!("built {:?} driver", config.sim.cpu);
    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::binary_trace::BinaryTraceWriter;
    use std::fs::File;
    use std::io::BufWriter;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("memtraffic_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn random_run_stops_at_cycle_limit() {
        let mut config = RunConfig::default();
        config.sim.cycles = 50;
        config.sim.output_dir = scratch_dir("random");
        let summary = Sim::new(&config).unwrap().simulate().unwrap();
        assert_eq!(summary, SimSummary { cycles: 50, finished: false });
        assert!(config.sim.output_dir.join("stats.json").exists());
    }

    #[test]
    fn dependency_trace_run_finishes_early() {
        let dir = scratch_dir("ramsim");
        let trace_path = dir.join("trace.bin");
        let mut writer = BinaryTraceWriter::new(BufWriter::new(File::create(&trace_path).unwrap())).unwrap();
        let first = writer.append(0x1000, 0, 0, 256, &[]).unwrap();
        writer.append(0x8000, 1, 4, 64, &[first]).unwrap();
        writer.finish().unwrap();

        let mut config = RunConfig::default();
        config.sim.cpu = CpuKind::DependencyTrace;
        config.sim.trace_file = Some(trace_path);
        config.sim.output_dir = dir;
        config.sim.cycles = 10_000;
        let summary = Sim::new(&config).unwrap().simulate().unwrap();
        assert!(summary.finished);
        assert!(summary.cycles < 10_000);
    }

    #[test]
    fn missing_trace_file_fails_to_build() {
        let mut config = RunConfig::default();
        config.sim.cpu = CpuKind::DependencyTrace;
        config.sim.trace_file = Some("/nonexistent/trace.bin".into());
        assert!(Sim::new(&config).is_err());
    }
}
