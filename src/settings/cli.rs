use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "otpgate", about = "One-time password issuance with request quotas")]
pub struct Cli {
    /// Path to a settings file, without or with the `.toml` extension.
    #[arg(long)]
    pub settings: Option<String>,
}
