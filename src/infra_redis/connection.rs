use crate::logger::*;
use crate::settings::Redis;
use anyhow::{Context, anyhow};
use redis::aio::ConnectionManager;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::time::Duration;

/// Opens the shared connection used by every store call and checks it with `PING`.
pub async fn connect(settings: &Redis) -> anyhow::Result<ConnectionManager> {
    let info = ConnectionInfo {
        addr: ConnectionAddr::Tcp(settings.host.clone(), settings.port),
        redis: RedisConnectionInfo {
            db: settings.db,
            password: settings.password.clone().filter(|p| !p.is_empty()),
            ..Default::default()
        },
    };
    let client = redis::Client::open(info)?;

    let dial_timeout = Duration::from_millis(settings.dial_timeout_ms);
    let mut manager = tokio::time::timeout(dial_timeout, client.get_connection_manager())
        .await
        .map_err(|_| anyhow!("redis dial timed out after {:?}", dial_timeout))?
        .with_context(|| format!("connect redis {}:{}", settings.host, settings.port))?;

    let response_timeout = Duration::from_millis(settings.response_timeout_ms);
    let pong: String = tokio::time::timeout(
        response_timeout,
        redis::cmd("PING").query_async(&mut manager),
    )
    .await
    .map_err(|_| anyhow!("redis PING timed out after {:?}", response_timeout))??;
    info!(host = %settings.host, port = settings.port, db = settings.db, %pong, "redis connected");

    Ok(manager)
}
