//! Shared test support: a scriptable in-memory runtime driver.

use crate::driver::RuntimeDriver;
use async_trait::async_trait;
use chrono::Utc;
use cubby_common::{Error, HostPort, Result, SandboxId, SandboxSummary};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory runtime driver recording every call, with scriptable failures.
#[derive(Default)]
pub struct MockDriver {
    engine: Mutex<Vec<SandboxSummary>>,
    endpoint: Mutex<Option<HostPort>>,
    kill_failures: Mutex<HashSet<String>>,
    create_delay: Mutex<Option<Duration>>,
    fail_pull: AtomicBool,
    fail_create: AtomicBool,
    fail_start: AtomicBool,
    fail_inspect: AtomicBool,
    seq: AtomicU64,
    pulls: AtomicUsize,
    creates: AtomicUsize,
    starts: AtomicUsize,
    inspects: AtomicUsize,
    kills: AtomicUsize,
    deletes: AtomicUsize,
    lists: AtomicUsize,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the engine with a sandbox (e.g. an orphan from a
    /// previous process lifetime).
    pub fn seed(&self, id: &str, created_at: i64) {
        self.engine.lock().push(SandboxSummary {
            id: SandboxId::from(id),
            created_at,
        });
    }

    pub fn set_endpoint(&self, endpoint: HostPort) {
        *self.endpoint.lock() = Some(endpoint);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock() = Some(delay);
    }

    pub fn fail_pull(&self) {
        self.fail_pull.store(true, Ordering::SeqCst);
    }

    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn fail_inspect(&self) {
        self.fail_inspect.store(true, Ordering::SeqCst);
    }

    pub fn fail_kill_for(&self, id: &str) {
        self.kill_failures.lock().insert(id.to_string());
    }

    pub fn clear_kill_failures(&self) {
        self.kill_failures.lock().clear();
    }

    pub fn engine_ids(&self) -> Vec<String> {
        self.engine
            .lock()
            .iter()
            .map(|s| s.id.to_string())
            .collect()
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn inspects(&self) -> usize {
        self.inspects.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Total driver calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.pulls()
            + self.creates()
            + self.starts()
            + self.inspects()
            + self.kills()
            + self.deletes()
            + self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuntimeDriver for MockDriver {
    async fn pull_image(&self, _image: &str) -> Result<()> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pull.load(Ordering::SeqCst) {
            return Err(Error::Driver("no such image".into()));
        }
        Ok(())
    }

    async fn create_sandbox(
        &self,
        _image: &str,
        _name: &str,
        _options: &serde_json::Value,
    ) -> Result<SandboxId> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let delay = *self.create_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::Driver("create rejected".into()));
        }
        let id = SandboxId::from(format!("sbx-{}", self.seq.fetch_add(1, Ordering::SeqCst) + 1));
        self.engine.lock().push(SandboxSummary {
            id: id.clone(),
            created_at: Utc::now().timestamp(),
        });
        Ok(id)
    }

    async fn start_sandbox(&self, _id: &SandboxId) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::Driver("start failed".into()));
        }
        Ok(())
    }

    async fn inspect_sandbox(&self, _id: &SandboxId) -> Result<Option<HostPort>> {
        self.inspects.fetch_add(1, Ordering::SeqCst);
        if self.fail_inspect.load(Ordering::SeqCst) {
            return Err(Error::Driver("inspect failed".into()));
        }
        Ok(self.endpoint.lock().clone())
    }

    async fn kill_sandbox(&self, id: &SandboxId) -> Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        if self.kill_failures.lock().contains(id.as_str()) {
            return Err(Error::Driver("engine unreachable".into()));
        }
        // Already-stopped and unknown ids count as success.
        Ok(())
    }

    async fn delete_sandbox(&self, id: &SandboxId) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.engine.lock().retain(|s| s.id != *id);
        Ok(())
    }

    async fn list_sandboxes(&self) -> Result<Vec<SandboxSummary>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.engine.lock().clone())
    }
}
