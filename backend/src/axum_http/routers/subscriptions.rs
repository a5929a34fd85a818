use crate::{
    auth::AuthUser,
    axum_http::{
        error_responses::SuccessResponse,
        extractors::{ValidJson, ValidQuery},
    },
    config::config_model::DotEnvyConfig,
    usecases::{
        plans::PlanUseCase, stripe_webhook::StripeWebhookUseCase,
        subscriptions::SubscriptionUseCase,
    },
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, post},
};
use crates::{
    domain::{
        repositories::{
            plans::PlanRepository, subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::{
            plans::CreatePlanRequest,
            subscriptions::{
                CancelSubscriptionQuery, DisableProductRequest, RazorpayCustomerRequest,
                RazorpaySubscriptionRequest, StripeCustomerRequest, StripeSubscriptionRequest,
                UpdateStripeSubscriptionRequest,
            },
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{plans::PlanPostgres, subscriptions::SubscriptionPostgres, users::UserPostgres},
    },
    payments::{
        Gateways, gateway::PaymentGateway, razorpay_client::RazorpayClient,
        stripe_client::StripeClient,
    },
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

type SubscriptionState<P, S, U> = State<Arc<SubscriptionUseCase<P, S, U>>>;

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let plan_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let user_repository = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));

    let stripe: Arc<dyn PaymentGateway> =
        Arc::new(StripeClient::new(config.stripe.secret_key.clone()));
    let razorpay: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(
        config.razorpay.key_id.clone(),
        config.razorpay.key_secret.clone(),
    ));

    let plan_usecase = PlanUseCase::new(Arc::clone(&plan_repository), Arc::clone(&stripe));
    let subscription_usecase = SubscriptionUseCase::new(
        plan_repository,
        Arc::clone(&subscription_repository),
        Arc::clone(&user_repository),
        Gateways::new(Arc::clone(&stripe), razorpay),
    );
    let webhook_usecase = StripeWebhookUseCase::new(
        subscription_repository,
        user_repository,
        stripe,
        config.stripe.webhook_secret.clone(),
    );

    let plan_routes = Router::new()
        .route("/plan", post(create_plan::<PlanPostgres>))
        .route("/plan/:gateway", get(list_plans::<PlanPostgres>))
        .with_state(Arc::new(plan_usecase));

    let subscription_routes = Router::new()
        .route(
            "/cancel",
            delete(cancel_subscription::<PlanPostgres, SubscriptionPostgres, UserPostgres>),
        )
        .route(
            "/stripe/customer",
            post(create_stripe_customer::<PlanPostgres, SubscriptionPostgres, UserPostgres>),
        )
        .route(
            "/stripe",
            post(create_stripe_subscription::<PlanPostgres, SubscriptionPostgres, UserPostgres>)
                .patch(
                    update_stripe_subscription::<PlanPostgres, SubscriptionPostgres, UserPostgres>,
                ),
        )
        .route(
            "/stripe/disable-products",
            post(disable_products::<PlanPostgres, SubscriptionPostgres, UserPostgres>),
        )
        .route(
            "/stripe/fetch",
            get(fetch_subscription::<PlanPostgres, SubscriptionPostgres, UserPostgres>),
        )
        .route(
            "/razorpay/customer",
            post(create_razorpay_customer::<PlanPostgres, SubscriptionPostgres, UserPostgres>),
        )
        .route(
            "/razorpay",
            post(create_razorpay_subscription::<PlanPostgres, SubscriptionPostgres, UserPostgres>),
        )
        .route(
            "/razorpay/confirm/:subscription_id",
            get(confirm_razorpay_subscription::<PlanPostgres, SubscriptionPostgres, UserPostgres>),
        )
        .with_state(Arc::new(subscription_usecase));

    let webhook_routes = Router::new()
        .route(
            "/webhook",
            post(stripe_webhook::<SubscriptionPostgres, UserPostgres>),
        )
        .with_state(Arc::new(webhook_usecase));

    Router::new()
        .merge(plan_routes)
        .merge(subscription_routes)
        .merge(webhook_routes)
}

pub async fn create_plan<P>(
    State(plan_usecase): State<Arc<PlanUseCase<P>>>,
    ValidJson(create_plan_request): ValidJson<CreatePlanRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    match plan_usecase.create_plan(create_plan_request).await {
        Ok(plan) => SuccessResponse::ok(plan).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_plans<P>(
    State(plan_usecase): State<Arc<PlanUseCase<P>>>,
    Path(gateway): Path<String>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    match plan_usecase.list_plans(&gateway).await {
        Ok(plans) => SuccessResponse::ok(plans).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel_subscription<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    auth: AuthUser,
    ValidQuery(cancel_query): ValidQuery<CancelSubscriptionQuery>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    if let Err(err) = subscription_usecase.resolve_caller(auth.user_id).await {
        return err.into_response();
    }

    match subscription_usecase.cancel_subscription(cancel_query).await {
        Ok(message) => SuccessResponse::ok(message).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_stripe_customer<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    ValidJson(customer_request): ValidJson<StripeCustomerRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match subscription_usecase.create_stripe_customer(customer_request).await {
        Ok(customer) => SuccessResponse::created(customer).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_stripe_subscription<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    ValidJson(subscription_request): ValidJson<StripeSubscriptionRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match subscription_usecase
        .create_stripe_subscription(subscription_request)
        .await
    {
        Ok(subscription) => SuccessResponse::ok(subscription).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn update_stripe_subscription<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    auth: AuthUser,
    ValidJson(update_request): ValidJson<UpdateStripeSubscriptionRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    if let Err(err) = subscription_usecase.resolve_caller(auth.user_id).await {
        return err.into_response();
    }

    match subscription_usecase
        .update_stripe_subscription(update_request)
        .await
    {
        Ok(change) => SuccessResponse::ok(change).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn disable_products<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    auth: AuthUser,
    ValidJson(disable_request): ValidJson<DisableProductRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    if let Err(err) = subscription_usecase.resolve_caller(auth.user_id).await {
        return err.into_response();
    }

    match subscription_usecase.disable_product(disable_request).await {
        Ok(report) => SuccessResponse::ok(report).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn fetch_subscription<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let caller = match subscription_usecase.resolve_caller(auth.user_id).await {
        Ok(caller) => caller,
        Err(err) => return err.into_response(),
    };

    match subscription_usecase.fetch_current_subscription(&caller).await {
        Ok(subscription) => SuccessResponse::ok(subscription).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_razorpay_customer<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    ValidJson(customer_request): ValidJson<RazorpayCustomerRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match subscription_usecase
        .create_razorpay_customer(customer_request)
        .await
    {
        Ok(customer) => SuccessResponse::created(customer).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_razorpay_subscription<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    ValidJson(subscription_request): ValidJson<RazorpaySubscriptionRequest>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match subscription_usecase
        .create_razorpay_subscription(subscription_request)
        .await
    {
        Ok(subscription) => SuccessResponse::created(subscription).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn confirm_razorpay_subscription<P, S, U>(
    State(subscription_usecase): SubscriptionState<P, S, U>,
    Path(subscription_id): Path<String>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    match subscription_usecase
        .confirm_razorpay_subscription(&subscription_id)
        .await
    {
        Ok(subscription) => SuccessResponse::created(subscription).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Always acknowledges; outcomes are only logged.
pub async fn stripe_webhook<S, U>(
    State(webhook_usecase): State<Arc<StripeWebhookUseCase<S, U>>>,
    headers: HeaderMap,
    payload: Bytes,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok());

    let outcome = webhook_usecase
        .handle_stripe_webhook(&payload, signature)
        .await;
    info!(outcome = ?outcome, "stripe webhook: acknowledged");

    Json(json!({ "event": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use crates::{
        domain::repositories::{
            subscriptions::MockSubscriptionRepository, users::MockUserRepository,
        },
        payments::gateway::MockPaymentGateway,
    };

    async fn deliver(
        webhook_secret: Option<&str>,
        headers: HeaderMap,
        payload: &'static [u8],
    ) -> (StatusCode, serde_json::Value) {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions.expect_upsert_subscription().times(0);

        let usecase = StripeWebhookUseCase::new(
            Arc::new(subscriptions),
            Arc::new(MockUserRepository::new()),
            Arc::new(MockPaymentGateway::new()),
            webhook_secret.map(str::to_string),
        );

        let response = stripe_webhook(State(Arc::new(usecase)), headers, Bytes::from_static(payload))
            .await
            .into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn webhook_acknowledges_failed_reconciliation() {
        let payload = br#"{"type":"subscription_schedule.updated","data":{"object":{}}}"#;

        let (status, body) = deliver(None, HeaderMap::new(), payload).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "event": true }));
    }

    #[tokio::test]
    async fn webhook_acknowledges_rejected_signature() {
        let mut headers = HeaderMap::new();
        headers.insert("stripe-signature", "t=1,v1=00".parse().unwrap());
        let payload = br#"{"type":"subscription_schedule.updated","data":{"object":{"subscription":"sub_1"}}}"#;

        let (status, body) = deliver(Some("whsec_test"), headers, payload).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "event": true }));
    }
}
