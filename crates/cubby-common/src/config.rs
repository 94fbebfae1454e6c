//! Configuration types for the cubby sandbox pool.
//!
//! Loading these from a file is the embedding application's job; the pool
//! only reads the parsed values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the sandbox pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Image reference all sandboxes are created from.
    pub image: String,

    /// Hard cap on concurrently running sandboxes.
    #[serde(default = "default_max_sandboxes")]
    pub max_sandboxes: usize,

    /// Age in seconds after which a sandbox is reaped.
    #[serde(default = "default_age_timeout")]
    pub age_timeout_secs: u64,

    /// Interval between reaper ticks in seconds.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,

    /// Timeout for a single readiness connection attempt, in milliseconds.
    #[serde(default = "default_probe_attempt_timeout")]
    pub probe_attempt_timeout_ms: u64,

    /// Delay between readiness attempts, in milliseconds.
    #[serde(default = "default_probe_poll_interval")]
    pub probe_poll_interval_ms: u64,

    /// Overall readiness deadline in seconds.
    #[serde(default = "default_probe_deadline")]
    pub probe_deadline_secs: u64,

    /// Engine-specific creation options, passed to the driver verbatim.
    #[serde(default)]
    pub runtime_options: serde_json::Value,
}

fn default_max_sandboxes() -> usize {
    10
}

fn default_age_timeout() -> u64 {
    500
}

fn default_reap_interval() -> u64 {
    10
}

fn default_probe_attempt_timeout() -> u64 {
    500
}

fn default_probe_poll_interval() -> u64 {
    500
}

fn default_probe_deadline() -> u64 {
    15
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            max_sandboxes: default_max_sandboxes(),
            age_timeout_secs: default_age_timeout(),
            reap_interval_secs: default_reap_interval(),
            probe_attempt_timeout_ms: default_probe_attempt_timeout(),
            probe_poll_interval_ms: default_probe_poll_interval(),
            probe_deadline_secs: default_probe_deadline(),
            runtime_options: serde_json::Value::Null,
        }
    }
}

impl PoolConfig {
    /// Create a config for the given image with default limits.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.image.is_empty() {
            return Err(Error::InvalidConfig("image is required".into()));
        }
        if self.max_sandboxes == 0 {
            return Err(Error::InvalidConfig("max_sandboxes must be > 0".into()));
        }
        if self.age_timeout_secs == 0 {
            return Err(Error::InvalidConfig("age_timeout_secs must be > 0".into()));
        }
        if self.reap_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "reap_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Age threshold as a [`Duration`].
    pub fn age_timeout(&self) -> Duration {
        Duration::from_secs(self.age_timeout_secs)
    }

    /// Reaper tick interval as a [`Duration`].
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    /// Per-attempt probe timeout as a [`Duration`].
    pub fn probe_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_attempt_timeout_ms)
    }

    /// Probe poll interval as a [`Duration`].
    pub fn probe_poll_interval(&self) -> Duration {
        Duration::from_millis(self.probe_poll_interval_ms)
    }

    /// Overall probe deadline as a [`Duration`].
    pub fn probe_deadline(&self) -> Duration {
        Duration::from_secs(self.probe_deadline_secs)
    }
}
