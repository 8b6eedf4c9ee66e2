use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::fs;

use anyhow::{ensure, Context};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::{Table, Value};

use crate::traffic::config::TrafficConfig;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CpuKind {
    #[default]
    Random,
    Stream,
    Trace,
    DependencyTrace,
}

impl CpuKind {
    pub fn needs_trace(self) -> bool {
        matches!(self, Self::Trace | Self::DependencyTrace)
    }
}

impl FromStr for CpuKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "random" => Ok(Self::Random),
            "stream" => Ok(Self::Stream),
            "trace" => Ok(Self::Trace),
            "dependency_trace" | "ramsim" => Ok(Self::DependencyTrace),
            _ => Err(format!(
                "unsupported cpu '{}', expected one of: random, stream, trace, dependency_trace",
                value
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    pub cpu: CpuKind,
    pub trace_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Upper bound on simulated cycles.
    pub cycles: u64,
    pub log_level: u64,
}

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> anyhow::Result<Self> {
        match section {
            Some(value) => value
                .clone()
                .try_into()
                .context("cannot deserialize config section"),
            None => {
                warn!("config section not found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cpu: CpuKind::Random,
            trace_file: None,
            output_dir: PathBuf::from("."),
            cycles: 100000,
            log_level: 0,
        }
    }
}

/// Parameters of the bundled bounded-queue memory model.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MemConfig {
    pub num_channels: usize,
    pub queue_capacity: usize,
    pub base_latency: u64,
    pub bytes_per_cycle: u32,
    pub line_bytes: u32,
}

impl Config for MemConfig {}

impl Default for MemConfig {
    fn default() -> Self {
        Self {
            num_channels: 1,
            queue_capacity: 32,
            base_latency: 20,
            bytes_per_cycle: 64,
            line_bytes: 64,
        }
    }
}

impl MemConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.num_channels > 0, "mem.num_channels must be > 0");
        ensure!(self.queue_capacity > 0, "mem.queue_capacity must be > 0");
        ensure!(self.bytes_per_cycle > 0, "mem.bytes_per_cycle must be > 0");
        ensure!(self.line_bytes > 0, "mem.line_bytes must be > 0");
        Ok(())
    }
}

/// All sections of a run configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub sim: SimConfig,
    pub mem: MemConfig,
    pub traffic: TrafficConfig,
}

impl RunConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let table: Table = toml::from_str(text).context("cannot parse config toml")?;
        Ok(Self {
            sim: SimConfig::from_section(table.get("sim")).context("in [sim]")?,
            mem: MemConfig::from_section(table.get("mem")).context("in [mem]")?,
            traffic: TrafficConfig::from_section(table.get("traffic")).context("in [traffic]")?,
        })
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sim.cpu.needs_trace() {
            ensure!(
                self.sim.trace_file.is_some(),
                "cpu {:?} needs sim.trace_file",
                self.sim.cpu
            );
        }
        self.mem.validate()?;
        self.traffic.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_deserialize_with_defaults() {
        let cfg = RunConfig::from_toml(
            r#"
            [sim]
            cpu = "dependency_trace"
            trace_file = "trace.bin"
            cycles = 500

            [traffic]
            cpu_clock_ratio = 2
            mem_clock_ratio = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sim.cpu, CpuKind::DependencyTrace);
        assert_eq!(cfg.sim.cycles, 500);
        assert_eq!(cfg.traffic.cpu_clock_ratio, 2);
        assert_eq!(cfg.traffic.max_pending, 256);
        assert_eq!(cfg.mem.queue_capacity, 32);
        cfg.validate().unwrap();
    }

    #[test]
    fn trace_cpu_without_trace_file_is_invalid() {
        let cfg = RunConfig::from_toml("[sim]\ncpu = \"trace\"\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cpu_kind_from_str() {
        assert_eq!("stream".parse::<CpuKind>(), Ok(CpuKind::Stream));
        assert_eq!("ramsim".parse::<CpuKind>(), Ok(CpuKind::DependencyTrace));
        assert!("gpu".parse::<CpuKind>().is_err());
    }

    #[test]
    fn malformed_section_is_an_error() {
        assert!(RunConfig::from_toml("[sim]\ncycles = \"many\"\n").is_err());
    }
}
