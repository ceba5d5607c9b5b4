//! Walks one user through issuance, a superseded code, validation and lockout.
//!
//! Uses the store named in the settings file:
//! $ cargo run --bin otp_demo -- --settings=settings/dev.toml
//!
//! With `store = "redis"` a server must be reachable. The demo deletes the
//! demo user's keys first, so it can be rerun.

use otpgate::application_impl::RealOtpService;
use otpgate::application_port::{OtpService, ValidationInput};
use otpgate::domain_model::{OtpKeys, UserId};
use otpgate::logger::*;
use otpgate::server::build_store;
use otpgate::settings::*;

const DEMO_USER: UserId = UserId(42);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new_bootstrap();
    let settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig::from(&settings.log))?;

    let store = build_store(&settings).await?;
    let keys = OtpKeys::for_user(DEMO_USER);
    for key in [&keys.request_count, &keys.request_value, &keys.forbid] {
        store.delete(key).await?;
    }
    let service = RealOtpService::new(store, settings.otp.policy()?);

    let first = service.request(DEMO_USER).await?;
    println!("request #1 -> {}", first.code);
    let second = service.request(DEMO_USER).await?;
    println!("request #2 -> {}", second.code);

    let stale = service
        .validate(ValidationInput {
            user_id: DEMO_USER,
            otp_code: first.code.value() as i64,
        })
        .await;
    println!("validate #1 code -> {:?}", stale);

    service
        .validate(ValidationInput {
            user_id: DEMO_USER,
            otp_code: second.code.value() as i64,
        })
        .await?;
    println!("validate #2 code -> ok, quota reset");

    for attempt in 1..=settings.otp.ceiling + 2 {
        match service.request(DEMO_USER).await {
            Ok(issued) => println!("request {} -> {}", attempt, issued.code),
            Err(e) => println!("request {} -> {}", attempt, e),
        }
    }

    Ok(())
}
