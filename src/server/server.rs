use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub otp_service: Arc<dyn OtpService>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let otp_service: Arc<dyn OtpService> = match settings.otp.backend.as_str() {
            "fake" => Arc::new(FakeOtpService::new()),
            "real" => {
                let policy = settings.otp.policy()?;
                let store = build_store(settings).await?;
                info!(?policy, "otp engine ready");
                Arc::new(RealOtpService::new(store, policy))
            }
            other => return Err(anyhow::anyhow!("Unknown otp backend: {}", other)),
        };

        info!("server started");

        Ok(Self { otp_service })
    }
}

pub async fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match settings.otp.store.as_str() {
        "memory" => {
            warn!("using in-process otp store, state is lost on restart and not shared between instances");
            Ok(Arc::new(MemoryKeyValueStore::new()))
        }
        "redis" => {
            let conn = connect(&settings.redis).await?;
            Ok(Arc::new(RedisKeyValueStore::new(
                conn,
                settings.redis.namespace.clone(),
                Duration::from_millis(settings.redis.response_timeout_ms),
            )))
        }
        other => Err(anyhow::anyhow!("Unknown otp store: {}", other)),
    }
}
