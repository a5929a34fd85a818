use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::{
        enums::gateways::GatewayKind,
        numeric::number_or_string,
        validation::{
            ValidateRequest, require_email, require_min_len, require_non_empty, require_prefix,
            require_positive,
        },
    },
};

/// Gateways report timestamps as epoch seconds; they are stored as UTC.
pub fn epoch_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCustomerRequest {
    pub name: String,
    pub email: String,
    #[serde(rename = "addressLine")]
    pub address_line: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

impl ValidateRequest for StripeCustomerRequest {
    fn validate(&self) -> Result<(), String> {
        require_min_len("name", &self.name, 3)?;
        require_email("email", &self.email)?;
        require_non_empty("addressLine", &self.address_line)?;
        require_non_empty("postal_code", &self.postal_code)?;
        require_non_empty("city", &self.city)?;
        require_non_empty("country", &self.country)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayCustomerRequest {
    pub name: String,
    pub email: String,
    pub contact: String,
}

impl ValidateRequest for RazorpayCustomerRequest {
    fn validate(&self) -> Result<(), String> {
        require_min_len("name", &self.name, 3)?;
        require_email("email", &self.email)?;
        require_non_empty("contact", &self.contact)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeSubscriptionRequest {
    pub customer_id: String,
    pub price_id: String,
    pub payment_id: String,
    #[serde(deserialize_with = "number_or_string")]
    pub trial_days: u32,
}

impl ValidateRequest for StripeSubscriptionRequest {
    fn validate(&self) -> Result<(), String> {
        require_prefix("customerId", &self.customer_id, "cus_")?;
        require_prefix("priceId", &self.price_id, "price_")?;
        require_prefix("paymentId", &self.payment_id, "pm_")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RazorpaySubscriptionRequest {
    pub plan_id: String,
    pub customer_id: String,
    #[serde(deserialize_with = "number_or_string")]
    pub start_at: i64,
    #[serde(deserialize_with = "number_or_string")]
    pub expire_by: i64,
    #[serde(default)]
    pub note_key: Option<String>,
}

impl ValidateRequest for RazorpaySubscriptionRequest {
    fn validate(&self) -> Result<(), String> {
        require_prefix("planId", &self.plan_id, "plan_")?;
        require_prefix("customerId", &self.customer_id, "cust_")?;
        require_positive("startAt", self.start_at)?;
        require_positive("expireBy", self.expire_by)?;
        if self.expire_by <= self.start_at {
            return Err("\"expireBy\" must be later than \"startAt\"".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStripeSubscriptionRequest {
    pub subscription_id: String,
    pub customer_id: String,
    pub price_id: String,
}

impl ValidateRequest for UpdateStripeSubscriptionRequest {
    fn validate(&self) -> Result<(), String> {
        require_prefix("subscriptionId", &self.subscription_id, "sub_")?;
        require_prefix("customerId", &self.customer_id, "cus_")?;
        require_prefix("priceId", &self.price_id, "price_")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableProductRequest {
    pub product_id: String,
    pub price_id: String,
}

impl ValidateRequest for DisableProductRequest {
    fn validate(&self) -> Result<(), String> {
        require_prefix("productId", &self.product_id, "prod_")?;
        require_prefix("priceId", &self.price_id, "price_")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionQuery {
    pub subscription_id: String,
    pub gateway: String,
}

impl CancelSubscriptionQuery {
    pub fn gateway_kind(&self) -> Option<GatewayKind> {
        GatewayKind::from_str(&self.gateway)
    }
}

impl ValidateRequest for CancelSubscriptionQuery {
    fn validate(&self) -> Result<(), String> {
        require_prefix("subscriptionId", &self.subscription_id, "sub_")?;
        if self.gateway_kind().is_none() {
            return Err("\"gateway\" must be one of [stripe, razorpay]".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub subscription_id: String,
    pub gateway: String,
    pub status: String,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_cancel: bool,
    pub cancel_at: Option<DateTime<Utc>>,
    pub user: Option<Uuid>,
    pub subscription: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionEntity> for SubscriptionDto {
    fn from(value: SubscriptionEntity) -> Self {
        Self {
            id: value.id,
            subscription_id: value.external_subscription_id,
            gateway: value.gateway,
            status: value.status,
            customer_id: value.customer_id,
            price_id: value.price_id,
            current_period_end: value.current_period_end,
            is_cancel: value.is_cancel,
            cancel_at: value.cancel_at,
            user: value.user_id,
            subscription: value.snapshot,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Result of scheduling a plan change: the cancel-at-period-end update and the
/// schedule that starts the new price at the period boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanChangeDto {
    pub cancel_subscription: serde_json::Value,
    pub updated_subscription: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisableFailure {
    pub subscription_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisableProductReport {
    pub success_message: String,
    pub product_id: String,
    pub price_id: String,
    pub affected_subscriptions: usize,
    pub updated_users: usize,
    pub failures: Vec<DisableFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_seconds_convert_in_utc() {
        let converted = epoch_to_utc(1_700_000_000).unwrap();
        assert_eq!(converted.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn stripe_customer_request_keeps_original_field_names() {
        let parsed: StripeCustomerRequest = serde_json::from_value(serde_json::json!({
            "name": "Jane Doe",
            "email": "jane@example.com",
            "addressLine": "1 Main St",
            "postal_code": "94105",
            "city": "San Francisco",
            "country": "US"
        }))
        .unwrap();

        assert_eq!(parsed.address_line, "1 Main St");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn stripe_subscription_request_checks_id_prefixes() {
        let req = StripeSubscriptionRequest {
            customer_id: "cus_1".to_string(),
            price_id: "price_1".to_string(),
            payment_id: "card_1".to_string(),
            trial_days: 14,
        };

        let err = req.validate().unwrap_err();
        assert!(err.contains("paymentId"));
    }

    #[test]
    fn stripe_subscription_request_accepts_trial_days_as_text_or_number() {
        for trial_days in [serde_json::json!("14"), serde_json::json!(14)] {
            let parsed: StripeSubscriptionRequest = serde_json::from_value(serde_json::json!({
                "customerId": "cus_1",
                "priceId": "price_1",
                "paymentId": "pm_1",
                "trialDays": trial_days
            }))
            .unwrap();

            assert_eq!(parsed.trial_days, 14);
            assert!(parsed.validate().is_ok());
        }
    }

    #[test]
    fn razorpay_subscription_request_accepts_epochs_as_text() {
        let parsed: RazorpaySubscriptionRequest = serde_json::from_value(serde_json::json!({
            "planId": "plan_1",
            "customerId": "cust_1",
            "startAt": "1700000000",
            "expireBy": 1800000000
        }))
        .unwrap();

        assert_eq!(parsed.start_at, 1_700_000_000);
        assert_eq!(parsed.expire_by, 1_800_000_000);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn razorpay_subscription_window_must_be_ordered() {
        let req = RazorpaySubscriptionRequest {
            plan_id: "plan_1".to_string(),
            customer_id: "cust_1".to_string(),
            start_at: 1_700_000_000,
            expire_by: 1_600_000_000,
            note_key: None,
        };

        assert!(req.validate().is_err());
    }

    #[test]
    fn cancel_query_accepts_gateway_in_any_case() {
        let query = CancelSubscriptionQuery {
            subscription_id: "sub_1".to_string(),
            gateway: "RAZORPAY".to_string(),
        };

        assert!(query.validate().is_ok());
        assert_eq!(query.gateway_kind(), Some(GatewayKind::Razorpay));

        let query = CancelSubscriptionQuery {
            subscription_id: "sub_1".to_string(),
            gateway: "paypal".to_string(),
        };
        assert!(query.validate().is_err());
    }
}
