//! Per-target exclusion.
//!
//! A printer receiving two byte streams at once prints garbage, so every
//! delivery holds the lock of its target from `open` until after `close`.
//! A target's entry lives only while a delivery holds or waits for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

use crate::error::TransportError;

use super::TransportTarget;

/// What to do when the target is already in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockPolicy {
    /// Queue behind the current job.
    #[default]
    Wait,
    /// Fail at once with `TransportError::Unavailable`.
    Reject,
}

type Slot = Arc<tokio::sync::Mutex<()>>;
type Table = Arc<Mutex<HashMap<String, Slot>>>;

/// Held for the duration of one delivery.
#[derive(Debug)]
pub struct TargetGuard {
    key: String,
    slot: Slot,
    table: Table,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TargetGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left: the table's and ours. Nobody else holds or waits.
        let idle = table
            .get(&self.key)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot) && Arc::strong_count(slot) == 2);
        if idle {
            table.remove(&self.key);
        }
        tracing::trace!(target_key = %self.key, evicted = idle, "target lock released");
    }
}

/// Lock table keyed by [`TransportTarget::key`].
#[derive(Debug, Default)]
pub struct TargetLocks {
    policy: LockPolicy,
    wait_timeout: Option<Duration>,
    locks: Table,
}

impl TargetLocks {
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            policy,
            wait_timeout: None,
            locks: Table::default(),
        }
    }

    /// Bound how long [`LockPolicy::Wait`] waits.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    fn slot(&self, key: &str) -> Slot {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub async fn acquire(&self, target: &TransportTarget) -> Result<TargetGuard, TransportError> {
        let key = target.key();
        let slot = self.slot(&key);

        let guard = match (self.policy, self.wait_timeout) {
            (LockPolicy::Reject, _) => Arc::clone(&slot)
                .try_lock_owned()
                .map_err(|_| TransportError::Unavailable(format!("{target}: target busy")))?,
            (LockPolicy::Wait, None) => Arc::clone(&slot).lock_owned().await,
            (LockPolicy::Wait, Some(after)) => tokio::time::timeout(after, Arc::clone(&slot).lock_owned())
                .await
                .map_err(|_| TransportError::Timeout {
                    operation: "target lock",
                    after,
                })?,
        };

        tracing::trace!(target_key = %key, "target lock acquired");
        Ok(TargetGuard {
            key,
            slot,
            table: Arc::clone(&self.locks),
            guard: Some(guard),
        })
    }
}
