//! Reaper - the recurring task that tears down sandboxes past their age limit.

use crate::driver::{tear_down, RuntimeDriver};
use crate::pool::PoolState;
use cubby_common::PoolConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Recurring reap task with a cancellable handle.
///
/// Each tick snapshots the pool, tears down every sandbox whose age has
/// reached the configured timeout, and frees its slot. The tick body is
/// awaited inline in the loop, so ticks never overlap; if a tick overruns
/// the interval, the next one is delayed rather than run concurrently.
pub struct Reaper {
    driver: Arc<dyn RuntimeDriver>,
    pool: PoolState,
    age_timeout: Duration,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Create a reaper for the given pool.
    ///
    /// The reap task is not started; call [`start()`](Self::start).
    pub fn new(driver: Arc<dyn RuntimeDriver>, pool: PoolState, config: &PoolConfig) -> Self {
        Self {
            driver,
            pool,
            age_timeout: config.age_timeout(),
            interval: config.reap_interval(),
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// Start the background reap task.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            tracing::warn!("Reaper already started");
            return;
        }

        let driver = Arc::clone(&self.driver);
        let pool = self.pool.clone();
        let age_timeout = self.age_timeout;
        let interval = self.interval;
        let shutdown = Arc::clone(&self.shutdown);
        let shutdown_notify = Arc::clone(&self.shutdown_notify);

        let handle = tokio::spawn(async move {
            reap_loop(driver, pool, age_timeout, interval, shutdown, shutdown_notify).await;
        });

        self.handle = Some(handle);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            age_timeout_secs = self.age_timeout.as_secs(),
            "Reaper started"
        );
    }

    /// Check if the reap task is running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.shutdown.load(Ordering::Relaxed)
    }

    /// Stop the reap task and wait for it to finish.
    pub async fn shutdown(&mut self) {
        tracing::info!("Shutting down reaper");
        self.shutdown.store(true, Ordering::Relaxed);
        self.shutdown_notify.notify_one();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = ?e, "Reap task panicked during shutdown");
            }
        }
    }
}

/// Background reap loop. Runs until shutdown is signaled.
async fn reap_loop(
    driver: Arc<dyn RuntimeDriver>,
    pool: PoolState,
    age_timeout: Duration,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
) {
    tracing::debug!("Reap loop started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick fires immediately; consume it.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = shutdown_notify.notified() => {
                tracing::debug!("Reap loop received shutdown signal");
                break;
            }

            _ = ticker.tick() => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                reap_tick(driver.as_ref(), &pool, age_timeout).await;
            }
        }
    }

    tracing::debug!("Reap loop exited");
}

/// One reap pass over the pool.
///
/// Teardown failure for one sandbox never aborts the pass; the entry is
/// kept and retried on the next tick. Returns the number reaped.
async fn reap_tick(driver: &dyn RuntimeDriver, pool: &PoolState, age_timeout: Duration) -> usize {
    let snapshot = pool.list();
    let mut reaped = 0;

    for sandbox in snapshot {
        let age = sandbox.age();
        if age < age_timeout {
            continue;
        }

        tracing::info!(
            sandbox_id = %sandbox.id,
            age_secs = age.as_secs(),
            age_timeout_secs = age_timeout.as_secs(),
            "Sandbox exceeded age limit, reaping"
        );

        match tear_down(driver, &sandbox.id).await {
            Ok(()) => {
                pool.deregister(&sandbox.id);
                reaped += 1;
            }
            Err(e) => {
                // Kept registered; the next tick retries.
                tracing::warn!(sandbox_id = %sandbox.id, error = %e, "Teardown failed during reap");
            }
        }
    }

    if reaped > 0 {
        tracing::info!(reaped, remaining = pool.count(), "Reap tick complete");
    }
    reaped
}
