use crate::domain_port::*;
use crate::keyed_lock::KeyedMutex;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|deadline| now < deadline)
    }
}

/// Process-local store with Redis-like expiry, driven by tokio's clock.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, Entry>,
    locks: KeyedMutex,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time to live of `key`, `None` when absent or without expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entry = self.live(key, now)?;
        entry.deadline.map(|deadline| deadline - now)
    }

    fn live(&self, key: &str, now: Instant) -> Option<Entry> {
        let entry = self.entries.get(key).map(|e| e.value().clone())?;
        if entry.is_live(now) {
            Some(entry)
        } else {
            self.entries.remove(key);
            None
        }
    }

    fn add(
        &self,
        key: &str,
        deadline: impl FnOnce(Option<Instant>) -> Option<Instant>,
    ) -> Result<i64, StoreError> {
        let current = self.live(key, Instant::now());
        let count = match &current {
            Some(entry) => parse_counter(&entry.data).ok_or_else(|| {
                StoreError::unavailable(StoreOp::Increment, key, "value is not an integer")
            })?,
            None => 0,
        };
        let count = count + 1;
        self.entries.insert(
            key.to_owned(),
            Entry {
                data: count.to_string().into_bytes(),
                deadline: deadline(current.and_then(|e| e.deadline)),
            },
        );
        Ok(count)
    }
}

fn parse_counter(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn exists(&self, key: &str) -> bool {
        let _guard = self.locks.lock(key).await;
        self.live(key, Instant::now()).is_some()
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let _guard = self.locks.lock(key).await;
        self.live(key, Instant::now())
            .map(|entry| entry.data)
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_owned(),
            })
    }

    async fn write(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let _guard = self.locks.lock(key).await;
        self.entries.insert(
            key.to_owned(),
            Entry {
                data: data.to_vec(),
                deadline: Some(Instant::now() + Duration::from_secs(ttl_secs(ttl))),
            },
        );
        Ok(())
    }

    async fn write_if_absent(
        &self,
        key: &str,
        data: &[u8],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let _guard = self.locks.lock(key).await;
        let now = Instant::now();
        if self.live(key, now).is_none() {
            self.entries.insert(
                key.to_owned(),
                Entry {
                    data: data.to_vec(),
                    deadline: Some(now + Duration::from_secs(ttl_secs(ttl))),
                },
            );
        }
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let _guard = self.locks.lock(key).await;
        self.add(key, |kept| kept)
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let _guard = self.locks.lock(key).await;
        let deadline = Instant::now() + Duration::from_secs(ttl_secs(ttl));
        self.add(key, |_| Some(deadline)).map_err(|e| match e {
            StoreError::Unavailable { key, reason, .. } => StoreError::Unavailable {
                op: StoreOp::IncrementWithTtl,
                key,
                reason,
            },
            other => other,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.locks.lock(key).await;
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn read_missing_key_is_not_found() {
        let store = MemoryKeyValueStore::new();
        let err = store.read("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { key } if key == "nope"));
        assert!(!store.exists("nope").await);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryKeyValueStore::new();
        store
            .write("k", b"v", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.read("k").await.unwrap(), b"v");

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.exists("k").await);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!store.exists("k").await);
        assert!(matches!(store.read("k").await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn write_if_absent_keeps_existing_value() {
        let store = MemoryKeyValueStore::new();
        store
            .write_if_absent("k", b"first", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .write_if_absent("k", b"second", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.read("k").await.unwrap(), b"first");
    }

    #[tokio::test(start_paused = true)]
    async fn increment_keeps_expiry_and_increment_with_ttl_resets_it() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(
            store
                .increment_with_ttl("c", Duration::from_secs(300))
                .await
                .unwrap(),
            1
        );

        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(store.increment("c").await.unwrap(), 2);
        assert_eq!(store.ttl("c"), Some(Duration::from_secs(200)));

        assert_eq!(
            store
                .increment_with_ttl("c", Duration::from_secs(300))
                .await
                .unwrap(),
            3
        );
        assert_eq!(store.ttl("c"), Some(Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn increment_of_absent_key_starts_at_one_without_expiry() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.increment("c").await.unwrap(), 1);
        assert_eq!(store.ttl("c"), None);
        assert_eq!(store.read("c").await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn increment_of_non_integer_fails() {
        let store = MemoryKeyValueStore::new();
        store
            .write("c", b"abc", Duration::from_secs(60))
            .await
            .unwrap();
        let err = store.increment("c").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unavailable { op: StoreOp::Increment, .. }
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryKeyValueStore::new();
        store.delete("k").await.unwrap();
        store
            .write("k", b"v", Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .increment_with_ttl("c", Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.read("c").await.unwrap(), b"50");
    }
}
