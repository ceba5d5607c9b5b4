use crate::domain_model::{OtpCode, UserId};
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct OtpIssued {
    pub user_id: UserId,
    pub code: OtpCode,
    pub expire_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ValidationInput {
    pub user_id: UserId,
    pub otp_code: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("otp requests are locked, wait for the cooldown to end")]
    QuotaLockedOut,
    #[error("otp request limit reached, wait {retry_after_secs}s before requesting again")]
    QuotaExceeded { retry_after_secs: u64 },
    #[error("no active otp, request a new one")]
    NoActiveOtp,
    #[error("invalid otp code")]
    InvalidCode,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<StoreError> for OtpError {
    fn from(err: StoreError) -> Self {
        match err {
            e @ StoreError::Unavailable { .. } => OtpError::StoreUnavailable(e.to_string()),
            StoreError::NotFound { key } => {
                OtpError::InternalError(anyhow::anyhow!("unexpected missing key {}", key))
            }
        }
    }
}

#[async_trait::async_trait]
pub trait OtpService: Send + Sync {
    /// Issues a fresh code for `user_id`, counting it against the quota.
    async fn request(&self, user_id: UserId) -> Result<OtpIssued, OtpError>;
    /// Checks and consumes the active code. A wrong code changes nothing.
    async fn validate(&self, input: ValidationInput) -> Result<(), OtpError>;
}
