use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{StatusCode, request::Parts},
};
use crates::domain::value_objects::validation::ValidateRequest;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::error_responses::ErrorResponse;

/// JSON body that has passed [`ValidateRequest::validate`].
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

/// Query string that has passed [`ValidateRequest::validate`].
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

fn reject(message: String) -> ErrorResponse {
    warn!(%message, "validation: request rejected");
    ErrorResponse::new(StatusCode::BAD_REQUEST, message)
}

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + ValidateRequest,
{
    type Rejection = ErrorResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| reject(rejection.body_text()))?;

        value.validate().map_err(reject)?;

        Ok(ValidJson(value))
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + ValidateRequest,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| reject(rejection.body_text()))?;

        value.validate().map_err(reject)?;

        Ok(ValidQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use crates::domain::value_objects::subscriptions::{
        CancelSubscriptionQuery, DisableProductRequest,
    };

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/subscription/stripe/disable-products")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_json_accepts_well_formed_body() {
        let req = json_request(r#"{"productId":"prod_1","priceId":"price_1"}"#);

        let ValidJson(body) = ValidJson::<DisableProductRequest>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(body.product_id, "prod_1");
    }

    #[tokio::test]
    async fn valid_json_rejects_bad_prefix_with_400() {
        let req = json_request(r#"{"productId":"item_1","priceId":"price_1"}"#);

        let rejection = ValidJson::<DisableProductRequest>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.code, 400);
        assert!(rejection.error.message.contains("productId"));
    }

    #[tokio::test]
    async fn valid_query_checks_gateway() {
        let (mut parts, _) = Request::builder()
            .uri("/api/subscription/cancel?subscriptionId=sub_1&gateway=paypal")
            .body(())
            .unwrap()
            .into_parts();

        let rejection = ValidQuery::<CancelSubscriptionQuery>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.code, 400);
    }
}
