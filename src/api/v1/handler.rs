use super::error::*;
use crate::application_port::{OtpService, ValidationInput};
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct OtpResponse {
    pub user_id: UserId,
    pub otp_code: u32,
    pub expire_at: DateTime<Utc>,
}

pub async fn request_otp(
    body: OtpRequest,
    otp_service: Arc<dyn OtpService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let issued = otp_service
        .request(body.user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = OtpResponse {
        user_id: issued.user_id,
        otp_code: issued.code.value(),
        expire_at: issued.expire_at,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct OtpValidateRequest {
    pub user_id: UserId,
    pub otp_code: i64,
}

#[derive(Debug, Serialize)]
pub struct OtpValidateResponse;

pub async fn validate_otp(
    body: OtpValidateRequest,
    otp_service: Arc<dyn OtpService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = ValidationInput {
        user_id: body.user_id,
        otp_code: body.otp_code,
    };
    otp_service
        .validate(input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(OtpValidateResponse)))
}
