//! Pool configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, DEFAULT_IDLE_CLEANUP_INTERVAL, DEFAULT_MAX_WAIT_TIME};

const fn default_max_wait_secs() -> u64 {
    DEFAULT_MAX_WAIT_TIME.as_secs()
}

const fn default_idle_cleanup_minutes() -> u64 {
    DEFAULT_IDLE_CLEANUP_INTERVAL.as_secs() / 60
}

/// Sizing and timing for one resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Hard cap on checked-out resources.
    pub max_size: usize,
    /// Resources created up front and kept warm after aging.
    #[serde(default)]
    pub init_size: usize,
    /// Default acquisition timeout in seconds.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Inactivity, in minutes, before idle resources are recycled.
    #[serde(default = "default_idle_cleanup_minutes")]
    pub idle_cleanup_minutes: u64,
}

impl PoolConfig {
    /// Config with default timings.
    #[must_use]
    pub const fn new(max_size: usize, init_size: usize) -> Self {
        Self {
            max_size,
            init_size,
            max_wait_secs: default_max_wait_secs(),
            idle_cleanup_minutes: default_idle_cleanup_minutes(),
        }
    }

    /// Set the default acquisition timeout in seconds.
    #[must_use]
    pub const fn with_max_wait_secs(mut self, secs: u64) -> Self {
        self.max_wait_secs = secs;
        self
    }

    /// Set the idle cleanup interval in minutes.
    #[must_use]
    pub const fn with_idle_cleanup_minutes(mut self, minutes: u64) -> Self {
        self.idle_cleanup_minutes = minutes;
        self
    }

    /// Acquisition timeout; zero falls back to the default.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        if self.max_wait_secs > 0 {
            Duration::from_secs(self.max_wait_secs)
        } else {
            DEFAULT_MAX_WAIT_TIME
        }
    }

    /// Aging interval; zero falls back to the default.
    #[must_use]
    pub const fn idle_cleanup_interval(&self) -> Duration {
        if self.idle_cleanup_minutes > 0 {
            Duration::from_secs(self.idle_cleanup_minutes.saturating_mul(60))
        } else {
            DEFAULT_IDLE_CLEANUP_INTERVAL
        }
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Describes the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_size == 0 {
            return Err("max_size must be greater than 0".into());
        }
        Ok(())
    }
}

/// Named pool configurations, keyed by pool name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolsConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, PoolConfig>,
}

impl PoolsConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Names the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse pool configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Malformed JSON or an invalid pool.
    pub fn from_json_str(input: &str) -> AppResult<Self> {
        let cfg: Self = serde_json::from_str(input).context("failed to parse pool configuration")?;
        cfg.validate().map_err(|e| anyhow!(e))?;
        Ok(cfg)
    }
}
