//! System description read from TOML.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use axiflow_axi::{ArbiterConfig, BusConfig, Region};
use serde::Deserialize;

/// Bus, arbiter and address map of the demo system.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub bus: BusConfig,
    pub arbiter: ArbiterConfig,
    #[serde(rename = "region")]
    pub regions: Vec<Region>,
    /// Cycle budget of every scenario.
    pub max_cycles: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            arbiter: ArbiterConfig::default(),
            regions: vec![Region::new("sram0", 0x1000_0000, 0x1000), Region::new("sram1", 0x2000_0000, 0x1000)],
            max_cycles: 10_000,
        }
    }
}

impl SystemConfig {
    /// Reads and validates a description.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid system description {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.bus.validate()?;
        Region::check_map(&config.regions)?;
        Ok(config)
    }
}
