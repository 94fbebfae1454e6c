//! Domain types shared across the cubby sandbox pool.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Opaque identifier for a sandbox, assigned by the runtime driver.
///
/// Unique among live sandboxes. A fresh random id is also used as a
/// client-side correlation token when asking the driver to create a
/// sandbox, before the driver has assigned its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SandboxId(String);

impl SandboxId {
    /// Create a new random sandbox ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a sandbox ID from a string.
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SandboxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SandboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SandboxId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SandboxId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<SandboxId> for String {
    fn from(id: SandboxId) -> String {
        id.0
    }
}

/// A resolved network endpoint where a sandbox workload becomes reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPort {
    /// Host name or address.
    pub host: String,
    /// Published TCP port.
    pub port: u16,
}

impl HostPort {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One live sandbox instance as tracked by the pool.
///
/// Immutable once registered, except for `endpoint` which is filled in
/// at most once after the workload's published port is discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    /// Driver-assigned identifier.
    pub id: SandboxId,
    /// Creation timestamp; never changes after registration.
    pub created_at: DateTime<Utc>,
    /// Published endpoint, if inspection resolved one.
    pub endpoint: Option<HostPort>,
}

impl Sandbox {
    /// Create a sandbox record stamped with the current time.
    pub fn new(id: SandboxId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            endpoint: None,
        }
    }

    /// Create a sandbox record from a creation time in seconds since epoch,
    /// as reported by the driver's listing.
    pub fn from_epoch_secs(id: SandboxId, created_secs: i64) -> Self {
        let created_at = Utc
            .timestamp_opt(created_secs, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            id,
            created_at,
            endpoint: None,
        }
    }

    /// Age of this sandbox, recomputed from the clock on every call.
    pub fn age(&self) -> Duration {
        let elapsed = Utc::now().signed_duration_since(self.created_at);
        elapsed.to_std().unwrap_or(Duration::ZERO)
    }

    /// Age in whole seconds.
    pub fn age_secs(&self) -> u64 {
        self.age().as_secs()
    }
}

/// Minimal per-sandbox record returned by the driver's listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSummary {
    /// Driver-assigned identifier.
    pub id: SandboxId,
    /// Creation time in seconds since epoch.
    pub created_at: i64,
}
