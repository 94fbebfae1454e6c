//! Readiness prober - confirms a sandbox endpoint accepts connections.

use cubby_common::{Error, HostPort, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Poll `endpoint` until it accepts a TCP connection or `deadline` elapses.
///
/// Each attempt is bounded by its own `attempt_timeout`, distinct from the
/// overall `deadline`, so one hung connection cannot starve the remaining
/// retry budget. Connection-refused and unreachable responses are treated
/// as "not ready yet" and retried after `poll_interval`.
///
/// When the deadline fires, the in-flight attempt and its timer are
/// dropped with the probe loop, leaving no outstanding probes behind.
///
/// # Errors
/// Returns [`Error::ProbeTimeout`] if no attempt succeeds in time.
pub async fn await_ready(
    endpoint: &HostPort,
    poll_interval: Duration,
    attempt_timeout: Duration,
    deadline: Duration,
) -> Result<()> {
    let addr = endpoint.to_string();
    let start = tokio::time::Instant::now();

    match timeout(deadline, probe_loop(&addr, poll_interval, attempt_timeout)).await {
        Ok(attempts) => {
            tracing::info!(
                endpoint = %addr,
                attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Endpoint ready"
            );
            Ok(())
        }
        Err(_) => {
            tracing::warn!(
                endpoint = %addr,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Readiness probe deadline reached"
            );
            Err(Error::ProbeTimeout(deadline))
        }
    }
}

/// Retry single attempts until one connects. Returns the attempt count.
async fn probe_loop(addr: &str, poll_interval: Duration, attempt_timeout: Duration) -> u32 {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if attempt(addr, attempt_timeout).await {
            return attempts;
        }
        tracing::trace!(endpoint = %addr, attempt = attempts, "Endpoint not ready, retrying...");
        tokio::time::sleep(poll_interval).await;
    }
}

/// One bounded connection attempt.
async fn attempt(addr: &str, attempt_timeout: Duration) -> bool {
    match timeout(attempt_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            // Refused, unreachable, and friends: not ready yet.
            tracing::trace!(endpoint = %addr, error = %e, "Connection attempt failed");
            false
        }
        Err(_) => {
            tracing::trace!(endpoint = %addr, "Connection attempt timed out");
            false
        }
    }
}
