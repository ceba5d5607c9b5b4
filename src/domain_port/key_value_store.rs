use std::time::Duration;

/// A keyed, TTL-aware byte store with atomic counters.
///
/// Implementations serialize every operation per key within the process and
/// know nothing about what the keys mean.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reports whether `key` currently holds a value. Store failures read as `false`.
    async fn exists(&self, key: &str) -> bool;

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn write(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Writes only when `key` is absent. An existing value is left as is and
    /// is not an error.
    async fn write_if_absent(
        &self,
        key: &str,
        data: &[u8],
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Increments the integer at `key`, treating an absent key as 0. The
    /// expiry of an existing key is kept.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Increments and (re)sets the expiry of `key` as one atomic unit.
    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Removes `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreOp {
    Exists,
    Read,
    Write,
    WriteIfAbsent,
    Increment,
    IncrementWithTtl,
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreOp::Exists => "exists",
            StoreOp::Read => "read",
            StoreOp::Write => "write",
            StoreOp::WriteIfAbsent => "write_if_absent",
            StoreOp::Increment => "increment",
            StoreOp::IncrementWithTtl => "increment_with_ttl",
            StoreOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key not found: {key}")]
    NotFound { key: String },
    #[error("store unavailable during {op} on {key}: {reason}")]
    Unavailable {
        op: StoreOp,
        key: String,
        reason: String,
    },
}

impl StoreError {
    pub fn unavailable(op: StoreOp, key: &str, reason: impl ToString) -> Self {
        StoreError::Unavailable {
            op,
            key: key.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Whole seconds for a store TTL, rounded up and never below one second.
pub fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rounds_up_to_whole_seconds() {
        assert_eq!(ttl_secs(Duration::from_secs(300)), 300);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }

    #[test]
    fn unavailable_names_op_and_key() {
        let err = StoreError::unavailable(StoreOp::IncrementWithTtl, "user:1:otp_request_count", "timed out");
        assert_eq!(
            err.to_string(),
            "store unavailable during increment_with_ttl on user:1:otp_request_count: timed out"
        );
    }
}
