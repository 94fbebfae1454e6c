//! Orchestration facade - the two user-visible operations.
//!
//! Composes admission, the runtime driver, the readiness prober, and the
//! pool into `acquire` and `drain_all`. This is the only surface the
//! embedding HTTP layer calls into.

use crate::driver::{tear_down, RuntimeDriver};
use crate::pool::PoolState;
use crate::probe;
use cubby_common::{Error, HostPort, PoolConfig, Result, Sandbox, SandboxId};
use std::sync::Arc;

/// Facade over the sandbox pool lifecycle.
///
/// Cheap to share behind an `Arc`. An `acquire` in flight runs to
/// completion or failure once creation starts; callers may abandon the
/// result, but the sandbox still ends up registered (and reaped on age)
/// rather than orphaned.
pub struct Orchestrator {
    driver: Arc<dyn RuntimeDriver>,
    pool: PoolState,
    config: PoolConfig,
}

impl Orchestrator {
    /// Create an orchestrator over a validated configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the configuration is rejected.
    pub fn new(driver: Arc<dyn RuntimeDriver>, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            image = %config.image,
            max_sandboxes = config.max_sandboxes,
            age_timeout_secs = config.age_timeout_secs,
            "Creating orchestrator"
        );
        Ok(Self {
            driver,
            pool: PoolState::new(),
            config,
        })
    }

    /// The pool state shared with the reaper.
    pub fn pool(&self) -> &PoolState {
        &self.pool
    }

    /// The configuration this orchestrator runs with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of live sandboxes.
    pub fn current_count(&self) -> usize {
        self.pool.count()
    }

    /// Snapshot of all live sandboxes.
    pub fn list(&self) -> Vec<Sandbox> {
        self.pool.list()
    }

    /// A reaper wired to this orchestrator's pool and driver, not started.
    pub fn reaper(&self) -> crate::reaper::Reaper {
        crate::reaper::Reaper::new(Arc::clone(&self.driver), self.pool.clone(), &self.config)
    }

    /// Rebuild pool state from the driver's listing.
    ///
    /// Called once at process start; nothing is persisted across restarts,
    /// so sandboxes left running by a previous lifetime are re-registered
    /// here and age out through the normal reap path.
    ///
    /// # Returns
    /// The number of sandboxes recovered.
    pub async fn recover(&self) -> Result<usize> {
        let listed = self.driver.list_sandboxes().await?;
        let mut recovered = 0;
        for summary in listed {
            let sandbox = Sandbox::from_epoch_secs(summary.id, summary.created_at);
            match self.pool.register(sandbox) {
                Ok(()) => recovered += 1,
                Err(e) => tracing::warn!(error = %e, "Skipping sandbox during recovery"),
            }
        }
        tracing::info!(recovered, "Pool state rebuilt from driver listing");
        Ok(recovered)
    }

    /// Acquire a new sandbox.
    ///
    /// Admission is checked first; a denied call makes no driver calls.
    /// The slot is reserved through creation, so concurrent acquires can
    /// never together exceed the configured maximum. The sandbox is
    /// registered as soon as start succeeds - before inspection - so the
    /// reaper and admission see it occupying a slot as early as possible.
    ///
    /// # Errors
    /// [`Error::AdmissionDenied`] at capacity; [`Error::CreationFailed`]
    /// when pull, create, or start fails (after best-effort rollback).
    pub async fn acquire(&self) -> Result<Sandbox> {
        let start = std::time::Instant::now();
        let reservation = self.pool.reserve(self.config.max_sandboxes)?;

        // Dropping `reservation` on any failure below releases the slot.
        self.driver
            .pull_image(&self.config.image)
            .await
            .map_err(|e| {
                tracing::warn!(image = %self.config.image, error = %e, "Image pull failed");
                Error::CreationFailed(format!("image pull failed: {e}"))
            })?;

        let token = SandboxId::new();
        let id = self
            .driver
            .create_sandbox(
                &self.config.image,
                token.as_str(),
                &self.config.runtime_options,
            )
            .await
            .map_err(|e| {
                tracing::warn!(image = %self.config.image, error = %e, "Sandbox create failed");
                Error::CreationFailed(format!("create failed: {e}"))
            })?;
        tracing::debug!(sandbox_id = %id, correlation = %token, "Sandbox created");

        if let Err(e) = self.driver.start_sandbox(&id).await {
            tracing::warn!(sandbox_id = %id, error = %e, "Start failed, rolling back create");
            if let Err(del) = self.driver.delete_sandbox(&id).await {
                tracing::warn!(sandbox_id = %id, error = %del, "Rollback delete failed");
            }
            return Err(Error::CreationFailed(format!("start failed: {e}")));
        }

        let mut sandbox = Sandbox::new(id.clone());
        reservation.commit(sandbox.clone())?;

        // Endpoint discovery is best-effort; the sandbox keeps its slot
        // whether or not a published port resolves.
        match self.driver.inspect_sandbox(&id).await {
            Ok(Some(endpoint)) => {
                tracing::debug!(sandbox_id = %id, endpoint = %endpoint, "Endpoint resolved");
                self.pool.set_endpoint(&id, endpoint.clone());
                sandbox.endpoint = Some(endpoint);
            }
            Ok(None) => {
                tracing::debug!(sandbox_id = %id, "No published endpoint");
            }
            Err(e) => {
                tracing::warn!(sandbox_id = %id, error = %e, "Inspect failed, endpoint unresolved");
            }
        }

        tracing::info!(
            sandbox_id = %id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            live = self.pool.count(),
            "Sandbox acquired"
        );
        Ok(sandbox)
    }

    /// Tear down every sandbox the driver knows about.
    ///
    /// Lists from the driver rather than the pool, so orphans from a prior
    /// process lifetime are drained too. Per-sandbox failures are logged
    /// and skipped; the failed sandbox stays registered.
    ///
    /// # Returns
    /// The number of sandboxes successfully torn down.
    pub async fn drain_all(&self) -> Result<usize> {
        let listed = self.driver.list_sandboxes().await?;
        tracing::info!(count = listed.len(), "Draining all sandboxes");

        let mut drained = 0;
        for summary in listed {
            match tear_down(self.driver.as_ref(), &summary.id).await {
                Ok(()) => {
                    self.pool.deregister(&summary.id);
                    drained += 1;
                }
                Err(e) => {
                    tracing::warn!(sandbox_id = %summary.id, error = %e, "Teardown failed during drain");
                }
            }
        }

        tracing::info!(drained, remaining = self.pool.count(), "Drain complete");
        Ok(drained)
    }

    /// Wait until `endpoint` accepts a connection, with the configured
    /// probe intervals and deadline.
    ///
    /// # Errors
    /// [`Error::ProbeTimeout`] if the endpoint never becomes ready.
    pub async fn await_ready(&self, endpoint: &HostPort) -> Result<()> {
        probe::await_ready(
            endpoint,
            self.config.probe_poll_interval(),
            self.config.probe_attempt_timeout(),
            self.config.probe_deadline(),
        )
        .await
    }
}
