//! revert::locks
//!
//! Per-repository exclusion for reverts.
//!
//! # Invariants
//!
//! - At most one revert per `owner/name` is in flight across clones of a
//!   [`RevertLocks`] registry
//! - Acquisition never waits: a held lock means the caller is rejected
//! - The lock is released when the guard is dropped (RAII pattern)
//!
//! Different repositories never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::core::types::GitRepositoryRef;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Registry of per-repository revert locks.
///
/// Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct RevertLocks {
    slots: Arc<Mutex<HashMap<GitRepositoryRef, Slot>>>,
}

/// Held revert lock for one repository.
#[derive(Debug)]
pub struct RevertGuard {
    repository: GitRepositoryRef,
    _guard: OwnedMutexGuard<()>,
}

impl RevertGuard {
    pub fn repository(&self) -> &GitRepositoryRef {
        &self.repository
    }
}

impl RevertLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `repository` if nobody holds it.
    ///
    /// Returns `None` when a revert of the same repository is in flight.
    pub fn try_acquire(&self, repository: &GitRepositoryRef) -> Option<RevertGuard> {
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(slots) => slots,
                Err(poisoned) => poisoned.into_inner(),
            };
            slots.entry(repository.clone()).or_default().clone()
        };

        let guard = slot.try_lock_owned().ok()?;
        Some(RevertGuard {
            repository: repository.clone(),
            _guard: guard,
        })
    }

    /// Whether a revert of `repository` is currently in flight.
    pub fn is_held(&self, repository: &GitRepositoryRef) -> bool {
        let slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots
            .get(repository)
            .map(|slot| slot.try_lock().is_err())
            .unwrap_or(false)
    }
}
