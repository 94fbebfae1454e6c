//! Runtime driver trait - the capability interface to the container engine.

use async_trait::async_trait;
use cubby_common::{HostPort, Result, SandboxId, SandboxSummary};

/// Capability set for the container engine driving real sandboxes.
///
/// This abstraction keeps the lifecycle core independent of the concrete
/// engine wire protocol; implementations talk to a remote engine and map
/// its responses into these operations.
#[async_trait]
pub trait RuntimeDriver: Send + Sync {
    /// Ensure the image is available locally, pulling it if necessary.
    ///
    /// # Errors
    /// Returns an error if the pull fails or the image does not exist.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Create a sandbox from the image.
    ///
    /// # Arguments
    /// * `image` - Image reference to create from
    /// * `name` - Client-side correlation token for the request
    /// * `options` - Engine-specific creation options, passed verbatim
    ///
    /// # Returns
    /// The engine-assigned sandbox ID on success.
    async fn create_sandbox(
        &self,
        image: &str,
        name: &str,
        options: &serde_json::Value,
    ) -> Result<SandboxId>;

    /// Start a created sandbox.
    async fn start_sandbox(&self, id: &SandboxId) -> Result<()>;

    /// Inspect a started sandbox to discover its published endpoint.
    ///
    /// # Returns
    /// The published host/port, or `None` if the workload exposes nothing.
    async fn inspect_sandbox(&self, id: &SandboxId) -> Result<Option<HostPort>>;

    /// Kill a running sandbox.
    ///
    /// Idempotent: implementations report "not running" and "not found"
    /// as success, since the desired end state has been reached.
    async fn kill_sandbox(&self, id: &SandboxId) -> Result<()>;

    /// Delete a stopped sandbox.
    ///
    /// Idempotent: implementations report "not found" as success.
    async fn delete_sandbox(&self, id: &SandboxId) -> Result<()>;

    /// List all sandboxes the engine currently knows about.
    async fn list_sandboxes(&self) -> Result<Vec<SandboxSummary>>;
}

/// Tear down one sandbox: kill, then delete.
///
/// Shared by the reaper and by drain. Failures are logged and reported to
/// the caller but never panic; the kill and delete calls are idempotent,
/// so an already-gone sandbox counts as a successful teardown.
pub async fn tear_down(driver: &dyn RuntimeDriver, id: &SandboxId) -> Result<()> {
    tracing::debug!(sandbox_id = %id, "Tearing down sandbox");
    driver.kill_sandbox(id).await?;
    driver.delete_sandbox(id).await?;
    tracing::info!(sandbox_id = %id, "Sandbox torn down");
    Ok(())
}
