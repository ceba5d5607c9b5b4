use crate::domain_model::UserId;
use rand::Rng;
use std::fmt;
use std::time::Duration;

pub const MAX_OTP_DIGITS: u8 = 9;

/// A one-time password with a fixed number of decimal digits.
///
/// Rendered zero-padded, so `7421` with six digits is stored and compared as
/// `"007421"`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct OtpCode {
    value: u32,
    digits: u8,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum OtpCodeError {
    #[error("otp code must not be negative")]
    Negative,
    #[error("otp code has more than {0} digits")]
    TooLong(u8),
}

impl OtpCode {
    /// Draws a uniformly random code with exactly `digits` digits.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, digits: u8) -> Self {
        let value = rng.gen_range(0..upper_bound(digits));
        Self { value, digits }
    }

    /// Interprets a caller-supplied integer as a code of `digits` digits.
    pub fn parse_submitted(submitted: i64, digits: u8) -> Result<Self, OtpCodeError> {
        if submitted < 0 {
            return Err(OtpCodeError::Negative);
        }
        if submitted >= upper_bound(digits) as i64 {
            return Err(OtpCodeError::TooLong(digits));
        }
        Ok(Self {
            value: submitted as u32,
            digits,
        })
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.value, width = self.digits as usize)
    }
}

fn upper_bound(digits: u8) -> u32 {
    10u32.pow(digits as u32)
}

/// The three store keys kept per user.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OtpKeys {
    pub request_count: String,
    pub request_value: String,
    pub forbid: String,
}

impl OtpKeys {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            request_count: format!("user:{}:otp_request_count", user_id),
            request_value: format!("user:{}:otp_request_value", user_id),
            forbid: format!("user:{}:otp_forbid", user_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtpPolicy {
    /// Issuances allowed per quota window before the user is locked out.
    pub ceiling: i64,
    pub quota_window: Duration,
    pub cooldown: Duration,
    pub digits: u8,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ceiling: 3,
            quota_window: Duration::from_secs(5 * 60),
            cooldown: Duration::from_secs(60 * 60),
            digits: 6,
        }
    }
}

impl OtpPolicy {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ceiling < 1 {
            anyhow::bail!("otp ceiling must be at least 1, got {}", self.ceiling);
        }
        if self.quota_window.is_zero() {
            anyhow::bail!("otp quota window must be positive");
        }
        if self.cooldown.is_zero() {
            anyhow::bail!("otp cooldown must be positive");
        }
        if self.digits == 0 || self.digits > MAX_OTP_DIGITS {
            anyhow::bail!(
                "otp digits must be within 1..={}, got {}",
                MAX_OTP_DIGITS,
                self.digits
            );
        }
        Ok(())
    }
}
