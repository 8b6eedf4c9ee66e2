use anyhow::ensure;
use serde::Deserialize;

use crate::sim::config::Config;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrafficConfig {
    pub seed: u64,
    /// Capacity of the dependency-trace pending set.
    pub max_pending: usize,
    pub cpu_clock_ratio: u64,
    pub mem_clock_ratio: u64,
    pub stream: StreamConfig,
}

impl Config for TrafficConfig {}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_pending: 256,
            cpu_clock_ratio: 1,
            mem_clock_ratio: 1,
            stream: StreamConfig::default(),
        }
    }
}

impl TrafficConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.max_pending > 0, "traffic.max_pending must be > 0");
        ensure!(self.cpu_clock_ratio > 0, "traffic.cpu_clock_ratio must be > 0");
        ensure!(self.mem_clock_ratio > 0, "traffic.mem_clock_ratio must be > 0");
        self.stream.validate()
    }
}

/// Shape of the `C = A + B` streaming kernel.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StreamConfig {
    pub num_streams: usize,
    /// Offset at which fresh array bases are drawn.
    pub array_bytes: u64,
    pub stride: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            num_streams: 3,
            array_bytes: 2 << 20,
            stride: 64,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.num_streams > 0, "traffic.stream.num_streams must be > 0");
        ensure!(self.stride > 0, "traffic.stream.stride must be > 0");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_defaults() {
        let table: toml::Table = toml::from_str("max_pending = 8\n[stream]\nstride = 128\n").unwrap();
        let value = toml::Value::Table(table);
        let cfg = TrafficConfig::from_section(Some(&value)).unwrap();
        assert_eq!(cfg.max_pending, 8);
        assert_eq!(cfg.cpu_clock_ratio, 1);
        assert_eq!(cfg.stream.stride, 128);
        assert_eq!(cfg.stream.num_streams, 3);
    }

    #[test]
    fn zero_clock_ratio_is_rejected() {
        let cfg = TrafficConfig {
            cpu_clock_ratio: 0,
            ..TrafficConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
