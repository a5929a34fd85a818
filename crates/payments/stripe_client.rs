use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error};

use crate::{
    domain::value_objects::enums::{cancel_modes::CancelMode, gateways::GatewayKind},
    payments::gateway::{
        CustomerContact, ExternalCustomer, ExternalObject, ExternalPrice, ExternalProduct,
        ExternalSchedule, ExternalSubscription, GatewayError, GatewayResult, NewCustomer,
        NewPrice, NewSchedule, NewSubscription, PaymentGateway,
    },
};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signed webhook timestamps older than this are rejected.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeId {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub customer: Option<String>,
    pub cancel_at: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub current_period_end: Option<i64>,
    pub plan: Option<StripePriceRef>,
    pub price: Option<StripePriceRef>,
}

#[derive(Debug, Deserialize)]
pub struct StripePriceRef {
    pub id: String,
}

impl StripeSubscription {
    /// Period end, falling back to the first item when needed.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }

    /// Price of the first subscription item (`plan.id` and `price.id` agree on Stripe).
    pub fn price_id(&self) -> Option<String> {
        self.items.data.first().and_then(|item| {
            item.plan
                .as_ref()
                .or(item.price.as_ref())
                .map(|price| price.id.clone())
        })
    }
}

pub fn subscription_from_raw(raw: serde_json::Value) -> GatewayResult<ExternalSubscription> {
    let parsed: StripeSubscription =
        serde_json::from_value(raw.clone()).map_err(|source| GatewayError::Decode {
            gateway: GatewayKind::Stripe,
            source,
        })?;

    Ok(ExternalSubscription {
        price_id: parsed.price_id(),
        current_period_end: parsed.period_end(),
        id: parsed.id,
        gateway: GatewayKind::Stripe,
        status: parsed.status,
        customer_id: parsed.customer,
        cancel_at: parsed.cancel_at,
        cancel_at_period_end: parsed.cancel_at_period_end,
        raw,
    })
}

fn object_from_raw(raw: serde_json::Value) -> GatewayResult<ExternalObject> {
    let parsed: StripeId =
        serde_json::from_value(raw.clone()).map_err(|source| GatewayError::Decode {
            gateway: GatewayKind::Stripe,
            source,
        })?;
    Ok(ExternalObject { id: parsed.id, raw })
}

fn transport(source: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        gateway: GatewayKind::Stripe,
        source,
    }
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> GatewayResult<serde_json::Value> {
        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = resp.text().await.map_err(transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|source| GatewayError::Decode {
                gateway: GatewayKind::Stripe,
                source,
            });
        }

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.clone()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.clone()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.clone()),
            context = %context,
            "stripe api request failed"
        );

        let message = details
            .and_then(|d| d.message)
            .unwrap_or_else(|| format!("Stripe API request failed: {context} (status {status})"));

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound {
                gateway: GatewayKind::Stripe,
                message,
            });
        }

        Err(GatewayError::Api {
            gateway: GatewayKind::Stripe,
            status: status.as_u16(),
            message,
        })
    }

    async fn post_form(
        &self,
        path: &str,
        body: &[(String, String)],
        context: &str,
    ) -> GatewayResult<serde_json::Value> {
        debug!(path, context, "stripe: POST");
        let resp = self
            .http
            .post(format!("{STRIPE_API_BASE}{path}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .form(body)
            .send()
            .await
            .map_err(transport)?;
        Self::ensure_success(resp, context).await
    }

    async fn get(&self, path: &str, context: &str) -> GatewayResult<serde_json::Value> {
        debug!(path, context, "stripe: GET");
        let resp = self
            .http
            .get(format!("{STRIPE_API_BASE}{path}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(transport)?;
        Self::ensure_success(resp, context).await
    }

    async fn delete(&self, path: &str, context: &str) -> GatewayResult<serde_json::Value> {
        debug!(path, context, "stripe: DELETE");
        let resp = self
            .http
            .delete(format!("{STRIPE_API_BASE}{path}"))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(transport)?;
        Self::ensure_success(resp, context).await
    }
}

fn pair(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

pub(crate) fn customer_form(new_customer: &NewCustomer) -> Vec<(String, String)> {
    let mut body = vec![
        pair("name", &new_customer.name),
        pair("email", &new_customer.email),
    ];
    match &new_customer.contact {
        CustomerContact::Address(address) => {
            body.push(pair("address[line1]", &address.line1));
            body.push(pair("address[postal_code]", &address.postal_code));
            body.push(pair("address[city]", &address.city));
            body.push(pair("address[country]", &address.country));
        }
        CustomerContact::Phone(phone) => body.push(pair("phone", phone)),
    }
    body
}

pub(crate) fn subscription_form(new_subscription: &NewSubscription) -> Vec<(String, String)> {
    let mut body = vec![
        pair("customer", &new_subscription.customer_id),
        pair("items[0][price]", &new_subscription.price_id),
        pair("expand[0]", "latest_invoice.payment_intent"),
    ];
    if let Some(trial_days) = new_subscription.trial_days {
        body.push(pair("trial_period_days", trial_days));
    }
    if let Some(note) = &new_subscription.note {
        body.push(pair("metadata[note]", note));
    }
    body
}

pub(crate) fn schedule_form(new_schedule: &NewSchedule) -> Vec<(String, String)> {
    let mut body = vec![
        pair("customer", &new_schedule.customer_id),
        pair("start_date", new_schedule.start_at),
        pair("end_behavior", "release"),
        pair("default_settings[billing_cycle_anchor]", "phase_start"),
    ];
    for (idx, phase) in new_schedule.phases.iter().enumerate() {
        body.push(pair(&format!("phases[{idx}][items][0][price]"), &phase.price_id));
    }
    body
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_customer(&self, new_customer: NewCustomer) -> GatewayResult<ExternalCustomer> {
        // https://stripe.com/docs/api/customers/create
        let raw = self
            .post_form("/customers", &customer_form(&new_customer), "create customer")
            .await?;
        object_from_raw(raw)
    }

    async fn create_subscription(
        &self,
        new_subscription: NewSubscription,
    ) -> GatewayResult<ExternalSubscription> {
        // https://stripe.com/docs/api/subscriptions/create
        let raw = self
            .post_form(
                "/subscriptions",
                &subscription_form(&new_subscription),
                "create subscription",
            )
            .await?;
        subscription_from_raw(raw)
    }

    async fn fetch_subscription(&self, subscription_id: &str) -> GatewayResult<ExternalSubscription> {
        // https://stripe.com/docs/api/subscriptions/retrieve
        let raw = self
            .get(
                &format!("/subscriptions/{subscription_id}"),
                "retrieve subscription",
            )
            .await?;
        subscription_from_raw(raw)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        mode: CancelMode,
    ) -> GatewayResult<ExternalSubscription> {
        let raw = match mode {
            // https://stripe.com/docs/api/subscriptions/cancel
            CancelMode::Immediate => {
                self.delete(
                    &format!("/subscriptions/{subscription_id}"),
                    "cancel subscription",
                )
                .await?
            }
            // https://stripe.com/docs/api/subscriptions/update#update_subscription-cancel_at_period_end
            CancelMode::EndOfPeriod => {
                self.post_form(
                    &format!("/subscriptions/{subscription_id}"),
                    &[pair("cancel_at_period_end", "true")],
                    "cancel subscription at period end",
                )
                .await?
            }
        };
        subscription_from_raw(raw)
    }

    async fn create_product(&self, name: &str) -> GatewayResult<ExternalProduct> {
        let raw = self
            .post_form("/products", &[pair("name", name)], "create product")
            .await?;
        object_from_raw(raw)
    }

    async fn create_price(&self, new_price: NewPrice) -> GatewayResult<ExternalPrice> {
        let body = [
            pair("unit_amount", new_price.amount_minor),
            pair("currency", &new_price.currency),
            pair("recurring[interval]", &new_price.interval),
            pair("recurring[interval_count]", new_price.interval_count),
            pair("product", &new_price.product_id),
        ];
        let raw = self.post_form("/prices", &body, "create price").await?;
        object_from_raw(raw)
    }

    async fn disable_product(&self, product_id: &str) -> GatewayResult<()> {
        self.post_form(
            &format!("/products/{product_id}"),
            &[pair("active", "false")],
            "disable product",
        )
        .await?;
        Ok(())
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> GatewayResult<()> {
        self.post_form(
            &format!("/payment_methods/{payment_method_id}/attach"),
            &[pair("customer", customer_id)],
            "attach payment method",
        )
        .await?;
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> GatewayResult<()> {
        self.post_form(
            &format!("/customers/{customer_id}"),
            &[pair(
                "invoice_settings[default_payment_method]",
                payment_method_id,
            )],
            "set default payment method",
        )
        .await?;
        Ok(())
    }

    async fn create_subscription_schedule(
        &self,
        new_schedule: NewSchedule,
    ) -> GatewayResult<ExternalSchedule> {
        // https://stripe.com/docs/api/subscription_schedules/create
        let raw = self
            .post_form(
                "/subscription_schedules",
                &schedule_form(&new_schedule),
                "create subscription schedule",
            )
            .await?;
        object_from_raw(raw)
    }
}

pub fn parse_event(payload: &[u8]) -> AnyResult<StripeEvent> {
    Ok(serde_json::from_slice(payload)?)
}

/// Verifies the `Stripe-Signature` header. https://stripe.com/docs/webhooks/signatures
pub fn verify_webhook_signature(
    webhook_secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> AnyResult<StripeEvent> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest.parse()?);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(hex::decode(rest)?);
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        anyhow::bail!("missing v1 in stripe-signature");
    }
    if (Utc::now().timestamp() - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        anyhow::bail!("stripe-signature timestamp outside tolerance");
    }

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok());
    if !matched {
        anyhow::bail!("invalid webhook signature");
    }

    parse_event(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::gateway::{CustomerAddress, SchedulePhase};
    use serde_json::json;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn subscription_fields_fall_back_to_first_item() {
        let external = subscription_from_raw(json!({
            "id": "sub_1",
            "status": "active",
            "customer": "cus_1",
            "cancel_at": null,
            "items": {
                "data": [{
                    "current_period_end": 1_700_000_000,
                    "plan": { "id": "price_gold" },
                    "price": { "id": "price_gold" }
                }]
            }
        }))
        .unwrap();

        assert_eq!(external.id, "sub_1");
        assert_eq!(external.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(external.price_id.as_deref(), Some("price_gold"));
        assert_eq!(external.current_period_end, Some(1_700_000_000));
        assert!(!external.cancel_at_period_end);
        assert_eq!(external.raw["status"], "active");
    }

    #[test]
    fn top_level_period_end_wins_over_items() {
        let external = subscription_from_raw(json!({
            "id": "sub_1",
            "status": "active",
            "current_period_end": 42,
            "cancel_at_period_end": true,
            "cancel_at": 42,
            "items": { "data": [{ "current_period_end": 7 }] }
        }))
        .unwrap();

        assert_eq!(external.current_period_end, Some(42));
        assert_eq!(external.cancel_at, Some(42));
        assert!(external.cancel_at_period_end);
        assert!(external.price_id.is_none());
    }

    #[test]
    fn subscription_without_id_is_a_decode_error() {
        let err = subscription_from_raw(json!({ "status": "active" })).unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }

    #[test]
    fn customer_form_carries_address_fields() {
        let body = customer_form(&NewCustomer {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            contact: CustomerContact::Address(CustomerAddress {
                line1: "1 Main St".to_string(),
                postal_code: "94105".to_string(),
                city: "SF".to_string(),
                country: "US".to_string(),
            }),
        });

        assert!(body.contains(&pair("address[line1]", "1 Main St")));
        assert!(body.contains(&pair("address[country]", "US")));
    }

    #[test]
    fn schedule_form_anchors_billing_on_phase_start() {
        let body = schedule_form(&NewSchedule {
            customer_id: "cus_1".to_string(),
            start_at: 1_700_000_000,
            phases: vec![SchedulePhase {
                price_id: "price_new".to_string(),
            }],
        });

        assert!(body.contains(&pair("start_date", "1700000000")));
        assert!(body.contains(&pair("end_behavior", "release")));
        assert!(body.contains(&pair("default_settings[billing_cycle_anchor]", "phase_start")));
        assert!(body.contains(&pair("phases[0][items][0][price]", "price_new")));
    }

    #[test]
    fn subscription_form_sends_trial_days_when_present() {
        let body = subscription_form(&NewSubscription {
            customer_id: "cus_1".to_string(),
            price_id: "price_1".to_string(),
            trial_days: Some(14),
            start_at: None,
            expire_by: None,
            note: None,
        });

        assert!(body.contains(&pair("trial_period_days", "14")));
        assert!(body.contains(&pair("items[0][price]", "price_1")));
    }

    #[test]
    fn valid_signature_yields_event() {
        let payload = br#"{"id":"evt_1","type":"subscription_schedule.updated","data":{"object":{"subscription":"sub_1"}}}"#;
        let timestamp = Utc::now().timestamp();
        let header = format!("t={timestamp},v1={}", sign("whsec_test", timestamp, payload));

        let event = verify_webhook_signature("whsec_test", payload, &header).unwrap();
        assert_eq!(event.type_, "subscription_schedule.updated");
        assert_eq!(event.data.object["subscription"], "sub_1");
    }

    #[test]
    fn tampered_payload_or_wrong_secret_is_rejected() {
        let payload = br#"{"type":"subscription_schedule.updated","data":{"object":{}}}"#;
        let timestamp = Utc::now().timestamp();
        let header = format!("t={timestamp},v1={}", sign("whsec_test", timestamp, payload));

        assert!(verify_webhook_signature("whsec_other", payload, &header).is_err());
        assert!(
            verify_webhook_signature(
                "whsec_test",
                br#"{"type":"other","data":{"object":{}}}"#,
                &header
            )
            .is_err()
        );
    }

    #[test]
    fn stale_or_incomplete_headers_are_rejected() {
        let payload = br#"{"type":"x","data":{"object":{}}}"#;
        let stale = Utc::now().timestamp() - WEBHOOK_TOLERANCE_SECS - 60;
        let header = format!("t={stale},v1={}", sign("whsec_test", stale, payload));
        assert!(verify_webhook_signature("whsec_test", payload, &header).is_err());

        assert!(verify_webhook_signature("whsec_test", payload, "v1=abcd").is_err());
        assert!(verify_webhook_signature("whsec_test", payload, "t=1").is_err());
    }
}
