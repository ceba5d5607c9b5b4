use super::handler;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let request_otp = warp::post()
        .and(warp::path("otp"))
        .and(warp::path("request"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.otp_service.clone()))
        .and_then(handler::request_otp);

    let validate_otp = warp::post()
        .and(warp::path("otp"))
        .and(warp::path("validate"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.otp_service.clone()))
        .and_then(handler::validate_otp);

    request_otp.or(validate_otp)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
