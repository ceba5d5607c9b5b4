use crate::application_port::{OtpError, OtpIssued, OtpService, ValidationInput};
use crate::domain_model::{OtpCode, UserId};
use chrono::Utc;
use std::time::Duration;

const FAKE_OTP_CODE: i64 = 123456;

/// Issues `123456` to everyone and accepts only that code. No quota.
#[derive(Debug, Default)]
pub struct FakeOtpService;

impl FakeOtpService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl OtpService for FakeOtpService {
    async fn request(&self, user_id: UserId) -> Result<OtpIssued, OtpError> {
        let code = OtpCode::parse_submitted(FAKE_OTP_CODE, 6)
            .map_err(|e| OtpError::InternalError(e.into()))?;
        let ttl = Duration::from_secs(300);
        Ok(OtpIssued {
            user_id,
            code,
            expire_at: Utc::now() + ttl,
        })
    }

    async fn validate(&self, input: ValidationInput) -> Result<(), OtpError> {
        match input.otp_code {
            FAKE_OTP_CODE => Ok(()),
            0 => Err(OtpError::InternalError(anyhow::anyhow!(
                "Simulated internal error"
            ))),
            _ => Err(OtpError::InvalidCode),
        }
    }
}
