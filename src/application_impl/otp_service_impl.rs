use crate::application_port::{OtpError, OtpIssued, OtpService, ValidationInput};
use crate::domain_model::{OtpCode, OtpKeys, OtpPolicy, UserId};
use crate::domain_port::{KeyValueStore, StoreError};
use crate::keyed_lock::KeyedMutex;
use crate::logger::*;
use anyhow::anyhow;
use chrono::Utc;
use rand::rngs::OsRng;
use std::sync::Arc;

const FORBID_MARKER: &[u8] = b"1";

/// OTP issuance and validation with a per-user request quota and cooldown.
///
/// Per user the state is three keys: the request counter (expires one quota
/// window after the first request), the current code (expires one quota window
/// after the latest request) and the forbid flag (expires after the cooldown).
/// Calls for the same user are serialized within this process.
pub struct RealOtpService {
    store: Arc<dyn KeyValueStore>,
    policy: OtpPolicy,
    users: KeyedMutex,
}

impl RealOtpService {
    pub fn new(store: Arc<dyn KeyValueStore>, policy: OtpPolicy) -> Self {
        Self {
            store,
            policy,
            users: KeyedMutex::new(),
        }
    }

    async fn request_count(&self, key: &str) -> Result<Option<i64>, OtpError> {
        let data = match self.store.read(key).await {
            Ok(data) => data,
            Err(StoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let count = std::str::from_utf8(&data)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| anyhow!("request counter at {} is not an integer", key))?;
        Ok(Some(count))
    }

    async fn issue(&self, keys: &OtpKeys, user_id: UserId) -> Result<OtpIssued, OtpError> {
        let code = OtpCode::generate(&mut OsRng, self.policy.digits);
        self.store
            .write(
                &keys.request_value,
                code.to_string().as_bytes(),
                self.policy.quota_window,
            )
            .await?;
        debug!(%user_id, %code, "otp issued");
        Ok(OtpIssued {
            user_id,
            code,
            expire_at: Utc::now() + self.policy.quota_window,
        })
    }
}

fn user_lock_key(user_id: UserId) -> String {
    format!("user:{}", user_id)
}

fn check_user(user_id: UserId) -> Result<(), OtpError> {
    if user_id.is_valid() {
        Ok(())
    } else {
        Err(OtpError::InvalidInput(
            "user_id must be a positive integer".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl OtpService for RealOtpService {
    async fn request(&self, user_id: UserId) -> Result<OtpIssued, OtpError> {
        check_user(user_id)?;
        let keys = OtpKeys::for_user(user_id);
        let _guard = self.users.lock(&user_lock_key(user_id)).await;

        if self.store.exists(&keys.forbid).await {
            debug!(%user_id, "otp request rejected during cooldown");
            return Err(OtpError::QuotaLockedOut);
        }

        match self.request_count(&keys.request_count).await? {
            None => {
                self.store
                    .increment_with_ttl(&keys.request_count, self.policy.quota_window)
                    .await?;
            }
            Some(count) if count < self.policy.ceiling => {
                let count = self.store.increment(&keys.request_count).await?;
                if count == 1 {
                    // The window lapsed between the read and INCR, so the new
                    // counter has no expiry yet.
                    self.store
                        .write(&keys.request_count, b"1", self.policy.quota_window)
                        .await?;
                }
            }
            Some(count) => {
                self.store
                    .write(&keys.forbid, FORBID_MARKER, self.policy.cooldown)
                    .await?;
                info!(%user_id, count, cooldown = ?self.policy.cooldown, "otp quota exceeded, user locked");
                return Err(OtpError::QuotaExceeded {
                    retry_after_secs: self.policy.cooldown.as_secs(),
                });
            }
        }

        self.issue(&keys, user_id).await
    }

    async fn validate(&self, input: ValidationInput) -> Result<(), OtpError> {
        check_user(input.user_id)?;
        let submitted = OtpCode::parse_submitted(input.otp_code, self.policy.digits)
            .map_err(|e| OtpError::InvalidInput(e.to_string()))?;
        let keys = OtpKeys::for_user(input.user_id);
        let _guard = self.users.lock(&user_lock_key(input.user_id)).await;

        let stored = match self.store.read(&keys.request_value).await {
            Ok(stored) => stored,
            Err(StoreError::NotFound { .. }) => return Err(OtpError::NoActiveOtp),
            Err(e) => return Err(e.into()),
        };
        if stored != submitted.to_string().as_bytes() {
            debug!(user_id = %input.user_id, "otp mismatch");
            return Err(OtpError::InvalidCode);
        }

        if let Err(e) = self.store.delete(&keys.request_value).await {
            warn!(user_id = %input.user_id, error = %e, "failed to delete otp value");
        }
        if let Err(e) = self.store.delete(&keys.request_count).await {
            warn!(user_id = %input.user_id, error = %e, "failed to delete otp request count");
        }
        debug!(user_id = %input.user_id, "otp validated");
        Ok(())
    }
}
