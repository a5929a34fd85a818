use axum::{http::StatusCode, response::IntoResponse};
use tracing::info;

use super::error_responses::{ErrorResponse, SuccessResponse};

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    ErrorResponse::new(StatusCode::NOT_FOUND, "Route not found")
}

pub async fn health_check() -> impl IntoResponse {
    info!("backend router: health_check handler invoked");
    SuccessResponse::ok("OK")
}
