use crate::domain_port::*;
use crate::keyed_lock::KeyedMutex;
use crate::logger::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult, Script};
use std::future::Future;
use std::time::Duration;

const INCR_EXPIRE: &str = include_str!("incr_expire.lua");

pub struct RedisKeyValueStore {
    conn: ConnectionManager,
    namespace: String,
    response_timeout: Duration,
    locks: KeyedMutex,
    incr_expire: Script,
}

impl RedisKeyValueStore {
    pub fn new(
        conn: ConnectionManager,
        namespace: impl Into<String>,
        response_timeout: Duration,
    ) -> Self {
        RedisKeyValueStore {
            conn,
            namespace: namespace.into(),
            response_timeout,
            locks: KeyedMutex::new(),
            incr_expire: Script::new(INCR_EXPIRE),
        }
    }

    fn key(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_owned()
        } else {
            format!("{}:{}", self.namespace, key)
        }
    }

    async fn run<T>(
        &self,
        op: StoreOp,
        key: &str,
        command: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.response_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(%op, %key, error = %e, "redis command failed");
                Err(StoreError::unavailable(op, key, e))
            }
            Err(_) => {
                error!(%op, %key, timeout = ?self.response_timeout, "redis command timed out");
                Err(StoreError::unavailable(op, key, "timed out"))
            }
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn exists(&self, key: &str) -> bool {
        let key = &self.key(key);
        let _guard = self.locks.lock(key).await;
        let mut conn = self.conn.clone();
        let exists: Result<bool, StoreError> =
            self.run(StoreOp::Exists, key, conn.exists(key)).await;
        exists.unwrap_or(false)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let key = &self.key(key);
        let _guard = self.locks.lock(key).await;
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = self.run(StoreOp::Read, key, conn.get(key)).await?;
        data.ok_or_else(|| StoreError::NotFound { key: key.clone() })
    }

    async fn write(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let key = &self.key(key);
        let _guard = self.locks.lock(key).await;
        let mut conn = self.conn.clone();
        let _: () = self
            .run(
                StoreOp::Write,
                key,
                conn.set_ex(key, data.to_vec(), ttl_secs(ttl)),
            )
            .await?;
        Ok(())
    }

    async fn write_if_absent(
        &self,
        key: &str,
        data: &[u8],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let key = &self.key(key);
        let _guard = self.locks.lock(key).await;
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(data.to_vec()).arg("NX").arg("EX").arg(ttl_secs(ttl));
        // Nil reply means the key was already set.
        let _: redis::Value = self
            .run(StoreOp::WriteIfAbsent, key, cmd.query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let key = &self.key(key);
        let _guard = self.locks.lock(key).await;
        let mut conn = self.conn.clone();
        self.run(StoreOp::Increment, key, conn.incr(key, 1i64)).await
    }

    async fn increment_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let key = &self.key(key);
        let _guard = self.locks.lock(key).await;
        let mut conn = self.conn.clone();
        let mut invocation = self.incr_expire.key(key);
        invocation.arg(ttl_secs(ttl));
        self.run(
            StoreOp::IncrementWithTtl,
            key,
            invocation.invoke_async(&mut conn),
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = &self.key(key);
        let _guard = self.locks.lock(key).await;
        let mut conn = self.conn.clone();
        let _: () = self.run(StoreOp::Delete, key, conn.del(key)).await?;
        Ok(())
    }
}
