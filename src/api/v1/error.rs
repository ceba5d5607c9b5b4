use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        warn!("Rejected request body: {}", e);
        ApiErrorCode::InvalidRequest
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::NotFound
    } else {
        ApiErrorCode::internal(format!("{:?}", err))
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiErrorCode {
    #[error("Invalid OTP request")]
    InvalidRequest,
    #[error("Your OTP request reach limit")]
    OtpLocked,
    #[error("Your OTP request reach limit, wait for {retry_after_minutes} minutes to make request again")]
    OtpLimitExceeded { retry_after_minutes: u64 },
    #[error("No active OTP, request a new one")]
    NoActiveOtp,
    #[error("Invalid OTP code")]
    InvalidOtp,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApiErrorCode::InvalidRequest => "InvalidRequest",
            ApiErrorCode::OtpLocked => "OtpLocked",
            ApiErrorCode::OtpLimitExceeded { .. } => "OtpLimitExceeded",
            ApiErrorCode::NoActiveOtp => "NoActiveOtp",
            ApiErrorCode::InvalidOtp => "InvalidOtp",
            ApiErrorCode::NotFound => "NotFound",
            ApiErrorCode::InternalError => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidRequest
            | ApiErrorCode::NoActiveOtp
            | ApiErrorCode::InvalidOtp => StatusCode::BAD_REQUEST,
            ApiErrorCode::OtpLocked | ApiErrorCode::OtpLimitExceeded { .. } => {
                StatusCode::FORBIDDEN
            }
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Every code goes out as its bare name, including those carrying message details.
impl Serialize for ApiErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<OtpError> for ApiErrorCode {
    fn from(error: OtpError) -> Self {
        match error {
            OtpError::InvalidInput(_) => ApiErrorCode::InvalidRequest,
            OtpError::QuotaLockedOut => ApiErrorCode::OtpLocked,
            OtpError::QuotaExceeded { retry_after_secs } => ApiErrorCode::OtpLimitExceeded {
                retry_after_minutes: retry_after_secs.div_ceil(60),
            },
            OtpError::NoActiveOtp => ApiErrorCode::NoActiveOtp,
            OtpError::InvalidCode => ApiErrorCode::InvalidOtp,
            OtpError::StoreUnavailable(e) => ApiErrorCode::internal(e),
            OtpError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
