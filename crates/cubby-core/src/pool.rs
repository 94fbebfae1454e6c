//! Pool state - the in-memory registry of live sandboxes.
//!
//! This is the only mutable shared resource in the system. Live entries
//! and outstanding slot reservations sit behind a single lock, so the
//! admission check and registration are atomic with respect to concurrent
//! acquires and reaper deregistrations.

use crate::admission;
use cubby_common::{Error, HostPort, Result, Sandbox, SandboxId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    /// Live sandboxes keyed by driver-assigned ID.
    entries: HashMap<SandboxId, Sandbox>,
    /// Slots granted to in-flight acquires that have not registered yet.
    reserved: usize,
}

/// Registry of currently live sandboxes.
///
/// Cheap to clone; all clones share the same state. The lock is never
/// held across an await point - every operation completes synchronously
/// inside its critical section.
#[derive(Debug, Clone, Default)]
pub struct PoolState {
    inner: Arc<Mutex<Inner>>,
}

impl PoolState {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent snapshot of all live sandboxes at call time.
    pub fn list(&self) -> Vec<Sandbox> {
        self.inner.lock().entries.values().cloned().collect()
    }

    /// Number of live sandboxes (reservations not included).
    pub fn count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Number of outstanding slot reservations.
    pub fn reserved(&self) -> usize {
        self.inner.lock().reserved
    }

    /// Register a sandbox without going through admission.
    ///
    /// Used when rebuilding the pool from the driver's listing at startup;
    /// orphans past the cap are still registered so the reaper sees them.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateId`] if the ID is already present.
    pub fn register(&self, sandbox: Sandbox) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(&sandbox.id) {
            tracing::error!(sandbox_id = %sandbox.id, "Duplicate sandbox ID on registration");
            return Err(Error::DuplicateId(sandbox.id));
        }
        tracing::debug!(sandbox_id = %sandbox.id, "Sandbox registered");
        inner.entries.insert(sandbox.id.clone(), sandbox);
        Ok(())
    }

    /// Remove a sandbox from the registry.
    ///
    /// Idempotent: an absent ID is a no-op, since a reap and a concurrent
    /// drain may both tear down the same sandbox.
    ///
    /// # Returns
    /// `true` if an entry was actually removed.
    pub fn deregister(&self, id: &SandboxId) -> bool {
        let removed = self.inner.lock().entries.remove(id).is_some();
        if removed {
            tracing::debug!(sandbox_id = %id, "Sandbox deregistered");
        }
        removed
    }

    /// Fill in a sandbox's endpoint once its published port is known.
    ///
    /// No-op if the sandbox has already been deregistered.
    pub fn set_endpoint(&self, id: &SandboxId, endpoint: HostPort) {
        let mut inner = self.inner.lock();
        if let Some(sandbox) = inner.entries.get_mut(id) {
            sandbox.endpoint = Some(endpoint);
        }
    }

    /// Reserve a slot for a sandbox about to be created.
    ///
    /// The admission check counts live entries plus outstanding
    /// reservations, all under one lock. The returned reservation must be
    /// committed with the created sandbox, or it releases its slot when
    /// dropped (creation failed).
    ///
    /// # Errors
    /// Returns [`Error::AdmissionDenied`] when the pool is at capacity.
    pub fn reserve(&self, max: usize) -> Result<SlotReservation> {
        let mut inner = self.inner.lock();
        let occupied = inner.entries.len() + inner.reserved;
        if !admission::try_admit(occupied, max) {
            tracing::debug!(occupied, max, "Admission denied");
            return Err(Error::AdmissionDenied(max));
        }
        inner.reserved += 1;
        Ok(SlotReservation {
            inner: Arc::clone(&self.inner),
            committed: false,
        })
    }
}

/// A slot granted by admission, held while the sandbox is being created.
///
/// Dropping an uncommitted reservation returns the slot to the pool.
#[derive(Debug)]
pub struct SlotReservation {
    inner: Arc<Mutex<Inner>>,
    committed: bool,
}

impl SlotReservation {
    /// Convert the reservation into a live registry entry.
    ///
    /// The swap happens under the same lock, so there is no window where
    /// the slot is counted twice or not at all.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateId`] if the ID is already registered;
    /// the slot is released in that case.
    pub fn commit(mut self, sandbox: Sandbox) -> Result<()> {
        self.committed = true;
        let mut inner = self.inner.lock();
        inner.reserved -= 1;
        if inner.entries.contains_key(&sandbox.id) {
            tracing::error!(sandbox_id = %sandbox.id, "Duplicate sandbox ID on registration");
            return Err(Error::DuplicateId(sandbox.id));
        }
        tracing::debug!(sandbox_id = %sandbox.id, "Sandbox registered");
        inner.entries.insert(sandbox.id.clone(), sandbox);
        Ok(())
    }
}

impl Drop for SlotReservation {
    fn drop(&mut self) {
        if !self.committed {
            let mut inner = self.inner.lock();
            inner.reserved -= 1;
            tracing::debug!("Released unused slot reservation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox(id: &str) -> Sandbox {
        Sandbox::new(SandboxId::from(id))
    }

    #[test]
    fn test_register_and_count() {
        let pool = PoolState::new();
        pool.register(sandbox("a")).unwrap();
        pool.register(sandbox("b")).unwrap();
        assert_eq!(pool.count(), 2);
        assert_eq!(pool.list().len(), 2);
    }

    #[test]
    fn test_register_duplicate() {
        let pool = PoolState::new();
        pool.register(sandbox("a")).unwrap();
        let result = pool.register(sandbox("a"));
        assert!(matches!(result, Err(Error::DuplicateId(_))));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_deregister_idempotent() {
        let pool = PoolState::new();
        pool.register(sandbox("a")).unwrap();
        assert!(pool.deregister(&SandboxId::from("a")));
        assert!(!pool.deregister(&SandboxId::from("a")));
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_set_endpoint_once_visible_in_list() {
        let pool = PoolState::new();
        pool.register(sandbox("a")).unwrap();
        pool.set_endpoint(&SandboxId::from("a"), HostPort::new("127.0.0.1", 3000));
        let listed = pool.list();
        assert_eq!(listed[0].endpoint, Some(HostPort::new("127.0.0.1", 3000)));
    }

    #[test]
    fn test_set_endpoint_after_deregister_is_noop() {
        let pool = PoolState::new();
        pool.register(sandbox("a")).unwrap();
        pool.deregister(&SandboxId::from("a"));
        pool.set_endpoint(&SandboxId::from("a"), HostPort::new("127.0.0.1", 3000));
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_reserve_denied_at_capacity() {
        let pool = PoolState::new();
        pool.register(sandbox("a")).unwrap();
        let result = pool.reserve(1);
        assert!(matches!(result, Err(Error::AdmissionDenied(1))));
    }

    #[test]
    fn test_reservations_count_against_capacity() {
        let pool = PoolState::new();
        let held = pool.reserve(1).unwrap();
        // Slot is taken even though nothing is registered yet.
        assert!(matches!(pool.reserve(1), Err(Error::AdmissionDenied(1))));
        drop(held);
        assert!(pool.reserve(1).is_ok());
    }

    #[test]
    fn test_dropped_reservation_releases_slot() {
        let pool = PoolState::new();
        {
            let _reservation = pool.reserve(1).unwrap();
            assert_eq!(pool.reserved(), 1);
        }
        assert_eq!(pool.reserved(), 0);
    }

    #[test]
    fn test_commit_registers_and_releases_reservation() {
        let pool = PoolState::new();
        let reservation = pool.reserve(1).unwrap();
        reservation.commit(sandbox("a")).unwrap();
        assert_eq!(pool.count(), 1);
        assert_eq!(pool.reserved(), 0);
        // Pool is now full via the live entry.
        assert!(pool.reserve(1).is_err());
    }

    #[test]
    fn test_commit_duplicate_releases_slot() {
        let pool = PoolState::new();
        pool.register(sandbox("a")).unwrap();
        let reservation = pool.reserve(2).unwrap();
        let result = reservation.commit(sandbox("a"));
        assert!(matches!(result, Err(Error::DuplicateId(_))));
        assert_eq!(pool.reserved(), 0);
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_concurrent_reserves_never_exceed_max() {
        let pool = PoolState::new();
        let max = 4;
        let mut handles = Vec::new();
        for i in 0..32 {
            let pool = pool.clone();
            handles.push(std::thread::spawn(move || {
                match pool.reserve(max) {
                    Ok(reservation) => {
                        reservation.commit(Sandbox::new(SandboxId::from(format!("s{i}")))).is_ok()
                    }
                    Err(_) => false,
                }
            }));
        }
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(admitted, max);
        assert_eq!(pool.count(), max);
        assert_eq!(pool.reserved(), 0);
    }
}
