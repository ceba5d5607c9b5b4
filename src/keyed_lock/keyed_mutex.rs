use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map from key to an async mutex. Entries are created on first use and never
/// removed, which keeps the map bounded by the number of distinct keys.
#[derive(Debug, Default)]
pub struct KeyedMutex {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

pub type KeyGuard = OwnedMutexGuard<()>;

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard {
        // Clone the Arc out so the shard lock is released before awaiting.
        let existing = self.locks.get(key).map(|entry| entry.value().clone());
        let mutex = match existing {
            Some(mutex) => mutex,
            None => self.locks.entry(key.to_owned()).or_default().clone(),
        };
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
