//! Error types for the cubby sandbox pool.

use crate::types::SandboxId;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cubby sandbox pool.
#[derive(Error, Debug)]
pub enum Error {
    /// Maximum concurrent sandboxes limit reached.
    ///
    /// An expected outcome under load, distinguishable from creation
    /// failures so callers can report capacity instead of an error.
    #[error("Maximum concurrent sandboxes limit ({0}) reached")]
    AdmissionDenied(usize),

    /// Sandbox creation failed (image pull, create, or start).
    #[error("Sandbox creation failed: {0}")]
    CreationFailed(String),

    /// A runtime driver call failed.
    #[error("Runtime driver call failed: {0}")]
    Driver(String),

    /// A sandbox with this ID is already registered.
    ///
    /// Should never occur with driver-assigned ids; indicates a broken
    /// invariant rather than a recoverable condition.
    #[error("Duplicate sandbox ID: {0}")]
    DuplicateId(SandboxId),

    /// Endpoint did not accept a connection within the deadline.
    #[error("Readiness probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error means the pool is at capacity.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Error::AdmissionDenied(_))
    }

    /// Check if this error means an endpoint was not ready in time.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Error::ProbeTimeout(_))
    }
}
