//! # cubby-core
//!
//! Lifecycle core for the cubby ephemeral sandbox pool: admission
//! control, age-based reaping, and readiness confirmation over an
//! abstract container-engine driver.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     Orchestrator                       │
//! │   acquire() / drain_all() / recover() / await_ready()  │
//! └──────┬──────────────────┬──────────────────┬───────────┘
//!        │ reserve/commit   │ create/start/    │ probe
//!        ▼                  │ inspect/teardown ▼
//! ┌─────────────┐           ▼          ┌───────────────┐
//! │  PoolState  │   ┌───────────────┐  │ await_ready() │
//! │ (one lock:  │   │ RuntimeDriver │  │  TCP probe    │
//! │  entries +  │   │  (trait, to   │  └───────────────┘
//! │  reserved)  │   │   the engine) │
//! └──────▲──────┘   └───────▲───────┘
//!        │ deregister       │ kill+delete
//!        └───────┬──────────┘
//!                │
//!         ┌──────┴──────┐
//!         │   Reaper    │  recurring tick, age >= timeout
//!         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use cubby_core::Orchestrator;
//! use cubby_common::PoolConfig;
//! use std::sync::Arc;
//!
//! # async fn example(driver: Arc<dyn cubby_core::RuntimeDriver>) -> cubby_common::Result<()> {
//! let config = PoolConfig::new("ubuntu:latest");
//! let orchestrator = Orchestrator::new(driver, config)?;
//!
//! // Rebuild state from sandboxes left running by a previous process.
//! orchestrator.recover().await?;
//!
//! // Start the age-based reaper.
//! let mut reaper = orchestrator.reaper();
//! reaper.start();
//!
//! // Acquire a sandbox (admission-gated).
//! let sandbox = orchestrator.acquire().await?;
//! if let Some(endpoint) = &sandbox.endpoint {
//!     orchestrator.await_ready(endpoint).await?;
//! }
//!
//! // Shutdown.
//! reaper.shutdown().await;
//! orchestrator.drain_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod admission;
mod driver;
mod orchestrator;
mod pool;
mod probe;
mod reaper;

#[cfg(test)]
pub(crate) mod testutil;

pub use driver::{tear_down, RuntimeDriver};
pub use orchestrator::Orchestrator;
pub use pool::{PoolState, SlotReservation};
pub use probe::await_ready;
pub use reaper::Reaper;
