//! Common types shared across the cubby sandbox pool.
//!
//! This crate provides:
//! - Core domain types (SandboxId, Sandbox, HostPort)
//! - Error handling types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::PoolConfig;
pub use error::{Error, Result};
pub use types::{HostPort, Sandbox, SandboxId, SandboxSummary};
