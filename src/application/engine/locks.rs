//! Per-user serialization of session read-modify-write cycles.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::UserIdentifier;

/// Keyed mutex registry: one lock per user identifier.
///
/// Events from the same user are processed one at a time; different users
/// never contend.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `user`'s session.
    ///
    /// The guard releases the lock when dropped.
    pub async fn acquire(&self, user: &UserIdentifier) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(user.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops `user`'s lock entry unless someone still holds or waits on it.
    ///
    /// Call after the guard from [`acquire`](Self::acquire) is dropped. The
    /// check runs under the map's shard lock, so an acquirer that already
    /// cloned the entry keeps it alive.
    pub fn release(&self, user: &UserIdentifier) {
        self.locks
            .remove_if(user.as_str(), |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
