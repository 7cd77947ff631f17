//! Configuration file handling for the CLI.
//!
//! A configuration file is TOML with a `[pool]` table (see
//! [`cistern_pool::PoolSection`]) and an optional `[workload]` table that
//! drives the `stress` command.

use anyhow::{Context, Result};
use cistern_pool::{ConfigError, PoolConfig, PoolSection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parameters of the simulated workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadSection {
    /// Number of worker threads
    pub threads: usize,

    /// Acquire/release cycles per thread
    pub iterations: usize,

    /// How long each lease is held, in milliseconds
    pub hold_ms: u64,

    /// Simulated connection setup time, in milliseconds
    pub connect_ms: u64,

    /// Every Nth validation reports a stale connection (0 disables)
    pub stale_every: usize,

    /// Every Nth connection attempt fails (0 disables)
    pub fail_every: usize,
}

impl Default for WorkloadSection {
    fn default() -> Self {
        Self {
            threads: 8,
            iterations: 100,
            hold_ms: 1,
            connect_ms: 0,
            stale_every: 0,
            fail_every: 0,
        }
    }
}

/// The whole configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Pool settings
    pub pool: PoolSection,

    /// Workload settings
    #[serde(default)]
    pub workload: WorkloadSection,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            pool: PoolSection::from(&PoolConfig::new(4).overflow(2)),
            workload: WorkloadSection::default(),
        }
    }
}

impl CliConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// The validated pool configuration.
    pub fn pool_config(&self) -> Result<PoolConfig, ConfigError> {
        PoolConfig::try_from(self.pool.clone())
    }
}
