mod otp_service;

pub use otp_service::*;
