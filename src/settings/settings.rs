use crate::domain_model::OtpPolicy;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    #[serde(default)]
    pub otp: Otp,
    #[serde(default)]
    pub redis: Redis,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Otp {
    pub backend: String, // "fake" or "real"
    pub store: String,   // "memory" or "redis"
    pub ceiling: i64,
    pub quota_window_secs: u64,
    pub cooldown_secs: u64,
    pub digits: u8,
}

impl Default for Otp {
    fn default() -> Self {
        let policy = OtpPolicy::default();
        Self {
            backend: "real".to_string(),
            store: "redis".to_string(),
            ceiling: policy.ceiling,
            quota_window_secs: policy.quota_window.as_secs(),
            cooldown_secs: policy.cooldown.as_secs(),
            digits: policy.digits,
        }
    }
}

impl Otp {
    pub fn policy(&self) -> Result<OtpPolicy> {
        let policy = OtpPolicy {
            ceiling: self.ceiling,
            quota_window: Duration::from_secs(self.quota_window_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
            digits: self.digits,
        };
        policy.validate()?;
        Ok(policy)
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Redis {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    pub namespace: String,
    pub dial_timeout_ms: u64,
    pub response_timeout_ms: u64,
}

impl Default for Redis {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            namespace: String::new(),
            dial_timeout_ms: 5_000,
            response_timeout_ms: 3_000,
        }
    }
}

// Keeps the password out of the startup log.
impl std::fmt::Debug for Redis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redis")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("db", &self.db)
            .field("namespace", &self.namespace)
            .field("dial_timeout_ms", &self.dial_timeout_ms)
            .field("response_timeout_ms", &self.response_timeout_ms)
            .finish()
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "OTPGATE";

/// Loads the TOML file at `path` (or the build default), then applies
/// `OTPGATE__SECTION__KEY` environment overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_settings(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("otpgate-{}-{}.toml", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let path = write_settings(
            "minimal",
            r#"
            [http]
            address = "127.0.0.1:8080"

            [log]
            filter = "info"
            "#,
        );
        let settings = parse_settings(path.to_str()).unwrap();
        assert_eq!(settings.http.address, "127.0.0.1:8080");
        assert!(settings.http.cert_path.is_none());
        assert_eq!(settings.otp.backend, "real");
        assert_eq!(settings.redis.port, 6379);

        let policy = settings.otp.policy().unwrap();
        assert_eq!(policy.ceiling, 3);
        assert_eq!(policy.quota_window, Duration::from_secs(300));
        assert_eq!(policy.cooldown, Duration::from_secs(3600));
        assert_eq!(policy.digits, 6);
    }

    #[test]
    fn otp_section_overrides_policy() {
        let path = write_settings(
            "otp",
            r#"
            [http]
            address = "0.0.0.0:8443"

            [log]
            filter = "debug"

            [otp]
            store = "memory"
            ceiling = 5
            digits = 8
            "#,
        );
        let settings = parse_settings(path.to_str()).unwrap();
        assert_eq!(settings.otp.store, "memory");
        let policy = settings.otp.policy().unwrap();
        assert_eq!(policy.ceiling, 5);
        assert_eq!(policy.digits, 8);
        assert_eq!(policy.quota_window, Duration::from_secs(300));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let otp = Otp {
            ceiling: 0,
            ..Otp::default()
        };
        assert!(otp.policy().is_err());
    }

    #[test]
    fn shipped_settings_keep_plain_key_names() {
        for path in ["settings/dev.toml", "settings/release.toml"] {
            let settings = parse_settings(Some(path)).unwrap();
            assert_eq!(settings.redis.namespace, "", "{}", path);
            assert!(settings.otp.policy().is_ok(), "{}", path);
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("settings/does-not-exist")).is_err());
    }

    #[test]
    fn redis_debug_hides_password() {
        let redis = Redis {
            password: Some("hunter2".to_string()),
            ..Redis::default()
        };
        let printed = format!("{:?}", redis);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }
}
