//! Configuration for a resource pool.
//!
//! [`PoolConfig`] is the in-memory form used by [`crate::ResourcePool::new`].
//! [`PoolSection`] is the serialized form read from configuration files, where
//! durations are plain milliseconds and a missing timeout means "wait forever".

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a resource pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of resources kept idle for reuse
    pub capacity: usize,

    /// Additional resources allowed beyond `capacity` under load
    pub overflow: usize,

    /// Maximum time `acquire` waits on a saturated pool; `None` waits forever
    pub timeout: Option<Duration>,

    /// Validate resources when they are returned, not only when they are leased
    pub validate_on_release: bool,

    /// Log a warning whenever a lease is dropped without being closed
    pub orphan_warnings: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            overflow: 0,
            timeout: Some(Duration::from_secs(30)),
            validate_on_release: false,
            orphan_warnings: false,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given capacity and default settings otherwise.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the overflow allowance.
    pub fn overflow(mut self, overflow: usize) -> Self {
        self.overflow = overflow;
        self
    }

    /// Set the acquire timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Let `acquire` wait indefinitely on a saturated pool.
    pub fn unlimited_wait(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Enable or disable validation on release.
    pub fn validate_on_release(mut self, enabled: bool) -> Self {
        self.validate_on_release = enabled;
        self
    }

    /// Enable or disable warnings for leases dropped without `close`.
    pub fn orphan_warnings(mut self, enabled: bool) -> Self {
        self.orphan_warnings = enabled;
        self
    }

    /// Check the configuration and return the absolute ceiling on live resources.
    pub fn validate(&self) -> Result<usize, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        self.capacity
            .checked_add(self.overflow)
            .ok_or(ConfigError::SizeOverflow {
                capacity: self.capacity,
                overflow: self.overflow,
            })
    }

    /// Absolute ceiling on live resources, `capacity + overflow`.
    ///
    /// Saturates instead of overflowing; use [`PoolConfig::validate`] to reject
    /// such configurations.
    pub fn max_size(&self) -> usize {
        self.capacity.saturating_add(self.overflow)
    }
}

/// Serialized pool settings, as found in the `[pool]` table of a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolSection {
    /// Maximum number of idle resources
    pub capacity: usize,

    /// Extra resources allowed under load
    #[serde(default)]
    pub overflow: usize,

    /// Acquire timeout in milliseconds; absent means wait forever
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Validate resources on release
    #[serde(default)]
    pub validate_on_release: bool,

    /// Warn about leases dropped without `close`
    #[serde(default)]
    pub orphan_warnings: bool,
}

impl TryFrom<PoolSection> for PoolConfig {
    type Error = ConfigError;

    fn try_from(section: PoolSection) -> Result<Self, Self::Error> {
        let config = PoolConfig {
            capacity: section.capacity,
            overflow: section.overflow,
            timeout: section.timeout_ms.map(Duration::from_millis),
            validate_on_release: section.validate_on_release,
            orphan_warnings: section.orphan_warnings,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<&PoolConfig> for PoolSection {
    fn from(config: &PoolConfig) -> Self {
        Self {
            capacity: config.capacity,
            overflow: config.overflow,
            timeout_ms: config
                .timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            validate_on_release: config.validate_on_release,
            orphan_warnings: config.orphan_warnings,
        }
    }
}
