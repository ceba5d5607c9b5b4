mod otp_service_fake;
mod otp_service_impl;

pub use otp_service_fake::*;
pub use otp_service_impl::*;
