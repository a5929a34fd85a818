use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::{
    domain::value_objects::enums::{cancel_modes::CancelMode, gateways::GatewayKind},
    payments::gateway::{
        CustomerContact, ExternalCustomer, ExternalObject, ExternalPrice, ExternalProduct,
        ExternalSchedule, ExternalSubscription, GatewayError, GatewayResult, NewCustomer,
        NewPrice, NewSchedule, NewSubscription, PaymentGateway,
    },
};

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Razorpay REST client (JSON bodies, basic auth with key id and secret).
pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorEnvelope {
    error: RazorpayErrorDetails,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetails {
    code: Option<String>,
    description: Option<String>,
    field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayId {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct RazorpaySubscription {
    pub id: String,
    pub status: String,
    pub plan_id: Option<String>,
    pub customer_id: Option<String>,
    pub current_start: Option<i64>,
    pub current_end: Option<i64>,
    pub end_at: Option<i64>,
}

pub fn subscription_from_raw(
    raw: serde_json::Value,
    cancel_at_period_end: bool,
) -> GatewayResult<ExternalSubscription> {
    let parsed: RazorpaySubscription =
        serde_json::from_value(raw.clone()).map_err(|source| GatewayError::Decode {
            gateway: GatewayKind::Razorpay,
            source,
        })?;

    // Razorpay leaves `current_end` empty until the first charge.
    let period_end = parsed.current_end.or(parsed.end_at);

    Ok(ExternalSubscription {
        id: parsed.id,
        gateway: GatewayKind::Razorpay,
        status: parsed.status,
        customer_id: parsed.customer_id,
        price_id: parsed.plan_id,
        current_period_end: period_end,
        cancel_at: if cancel_at_period_end { period_end } else { None },
        cancel_at_period_end,
        raw,
    })
}

fn transport(source: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        gateway: GatewayKind::Razorpay,
        source,
    }
}

fn unsupported(operation: &'static str) -> GatewayError {
    GatewayError::Unsupported {
        gateway: GatewayKind::Razorpay,
        operation,
    }
}

pub(crate) fn customer_body(new_customer: &NewCustomer) -> serde_json::Value {
    let mut body = json!({
        "name": new_customer.name,
        "email": new_customer.email,
    });
    if let CustomerContact::Phone(contact) = &new_customer.contact {
        body["contact"] = json!(contact);
    }
    body
}

pub(crate) fn subscription_body(new_subscription: &NewSubscription) -> serde_json::Value {
    json!({
        "plan_id": new_subscription.price_id,
        "total_count": 1,
        "quantity": 1,
        "customer_id": new_subscription.customer_id,
        "customer_notify": 1,
        "start_at": new_subscription.start_at,
        "expire_by": new_subscription.expire_by,
        "addons": [],
        "notes": { "notes_key_1": new_subscription.note },
    })
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id,
            key_secret,
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> GatewayResult<serde_json::Value> {
        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|source| GatewayError::Decode {
                gateway: GatewayKind::Razorpay,
                source,
            });
        }

        let details = serde_json::from_str::<RazorpayErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            razorpay_error_code = ?details.as_ref().and_then(|d| d.code.clone()),
            razorpay_error_field = ?details.as_ref().and_then(|d| d.field.clone()),
            context = %context,
            "razorpay api request failed"
        );

        let message = details.and_then(|d| d.description).unwrap_or_else(|| {
            format!("Razorpay API request failed: {context} (status {status})")
        });

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound {
                gateway: GatewayKind::Razorpay,
                message,
            });
        }

        Err(GatewayError::Api {
            gateway: GatewayKind::Razorpay,
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        context: &str,
    ) -> GatewayResult<serde_json::Value> {
        debug!(path, context, "razorpay: POST");
        let resp = self
            .http
            .post(format!("{RAZORPAY_API_BASE}{path}"))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        Self::ensure_success(resp, context).await
    }

    async fn get(&self, path: &str, context: &str) -> GatewayResult<serde_json::Value> {
        debug!(path, context, "razorpay: GET");
        let resp = self
            .http
            .get(format!("{RAZORPAY_API_BASE}{path}"))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(transport)?;
        Self::ensure_success(resp, context).await
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_customer(&self, new_customer: NewCustomer) -> GatewayResult<ExternalCustomer> {
        let raw = self
            .post_json("/customers", &customer_body(&new_customer), "create customer")
            .await?;
        let parsed: RazorpayId =
            serde_json::from_value(raw.clone()).map_err(|source| GatewayError::Decode {
                gateway: GatewayKind::Razorpay,
                source,
            })?;
        Ok(ExternalObject { id: parsed.id, raw })
    }

    async fn create_subscription(
        &self,
        new_subscription: NewSubscription,
    ) -> GatewayResult<ExternalSubscription> {
        let raw = self
            .post_json(
                "/subscriptions",
                &subscription_body(&new_subscription),
                "create subscription",
            )
            .await?;
        subscription_from_raw(raw, false)
    }

    async fn fetch_subscription(&self, subscription_id: &str) -> GatewayResult<ExternalSubscription> {
        let raw = self
            .get(
                &format!("/subscriptions/{subscription_id}"),
                "fetch subscription",
            )
            .await?;
        subscription_from_raw(raw, false)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        mode: CancelMode,
    ) -> GatewayResult<ExternalSubscription> {
        let at_cycle_end = matches!(mode, CancelMode::EndOfPeriod);
        let raw = self
            .post_json(
                &format!("/subscriptions/{subscription_id}/cancel"),
                &json!({ "cancel_at_cycle_end": u8::from(at_cycle_end) }),
                "cancel subscription",
            )
            .await?;
        subscription_from_raw(raw, at_cycle_end)
    }

    async fn create_product(&self, _name: &str) -> GatewayResult<ExternalProduct> {
        Err(unsupported("create product"))
    }

    async fn create_price(&self, _new_price: NewPrice) -> GatewayResult<ExternalPrice> {
        Err(unsupported("create price"))
    }

    async fn disable_product(&self, _product_id: &str) -> GatewayResult<()> {
        Err(unsupported("disable product"))
    }

    async fn attach_payment_method(
        &self,
        _customer_id: &str,
        _payment_method_id: &str,
    ) -> GatewayResult<()> {
        Err(unsupported("attach payment method"))
    }

    async fn set_default_payment_method(
        &self,
        _customer_id: &str,
        _payment_method_id: &str,
    ) -> GatewayResult<()> {
        Err(unsupported("set default payment method"))
    }

    async fn create_subscription_schedule(
        &self,
        _new_schedule: NewSchedule,
    ) -> GatewayResult<ExternalSchedule> {
        Err(unsupported("create subscription schedule"))
    }
}
