mod otp;
mod user;

pub use otp::*;
pub use user::*;
