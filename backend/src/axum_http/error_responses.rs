use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::subscriptions::SubscriptionError;

pub const SUCCESS_STATUS: &str = "success";

/// `{ code, data, status }`
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub code: u16,
    pub data: T,
    pub status: &'static str,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            code: status.as_u16(),
            data,
            status: SUCCESS_STATUS,
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Self {
        Self::new(StatusCode::CREATED, data)
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// `{ code, error: { message } }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            error: ErrorBody {
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            SubscriptionError::Internal(err) => {
                error!(error = ?err, "subscriptions: internal error");
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse::new(status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::{
        domain::value_objects::enums::gateways::GatewayKind, payments::gateway::GatewayError,
    };

    #[test]
    fn success_envelope_mirrors_status_code() {
        let body = serde_json::to_value(SuccessResponse::created(serde_json::json!({"id": "cus_1"})))
            .unwrap();

        assert_eq!(body["code"], 201);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["id"], "cus_1");
    }

    #[test]
    fn gateway_message_is_passed_through() {
        let response = SubscriptionError::Gateway(GatewayError::Api {
            gateway: GatewayKind::Stripe,
            status: 402,
            message: "Your card was declined.".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_envelope_shape() {
        let body =
            serde_json::to_value(ErrorResponse::new(StatusCode::NOT_FOUND, "missing")).unwrap();

        assert_eq!(body["code"], 404);
        assert_eq!(body["error"]["message"], "missing");
    }

    #[test]
    fn internal_errors_are_masked() {
        let response =
            SubscriptionError::Internal(anyhow::anyhow!("connection refused")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
