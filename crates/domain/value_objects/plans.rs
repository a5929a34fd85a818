use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::plans::PlanEntity,
    value_objects::{
        numeric::number_or_string,
        validation::{ValidateRequest, require_non_empty, require_one_of, require_positive},
    },
};

/// Trial length recorded on every Stripe plan at creation time.
pub const STRIPE_TRIAL_DAYS: i32 = 14;

pub const SUPPORTED_CURRENCIES: [&str; 2] = ["usd", "INR"];

/// Converts a major-unit amount (e.g. dollars) into gateway minor units (cents).
pub fn to_minor_units(amount: i64) -> Option<i64> {
    amount.checked_mul(100)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub product_name: String,
    pub currency: String,
    /// Major units; the stored plan keeps minor units.
    #[serde(deserialize_with = "number_or_string")]
    pub amount: i64,
    pub interval: String,
    pub interval_count: u32,
    #[serde(default)]
    pub description: Option<String>,
}

impl ValidateRequest for CreatePlanRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("productName", &self.product_name)?;
        require_one_of("currency", &self.currency, &SUPPORTED_CURRENCIES)?;
        require_positive("amount", self.amount)?;
        require_non_empty("interval", &self.interval)?;
        require_positive("intervalCount", self.interval_count.into())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanDto {
    pub id: Uuid,
    pub gateway: String,
    pub name: String,
    pub product_id: String,
    pub price_id: String,
    pub currency: String,
    pub amount: i64,
    pub billing_interval: String,
    pub interval_count: i32,
    pub trial_days: i32,
    pub is_disabled: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            gateway: value.gateway,
            name: value.name,
            product_id: value.external_product_id,
            price_id: value.external_price_id,
            currency: value.currency,
            amount: value.amount,
            billing_interval: value.billing_interval,
            interval_count: value.interval_count,
            trial_days: value.trial_days,
            is_disabled: value.is_disabled,
            description: value.description,
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePlanRequest {
        CreatePlanRequest {
            product_name: "Gold".to_string(),
            currency: "usd".to_string(),
            amount: 10,
            interval: "month".to_string(),
            interval_count: 1,
            description: None,
        }
    }

    #[test]
    fn minor_units_are_hundredths() {
        assert_eq!(to_minor_units(10), Some(1000));
        assert_eq!(to_minor_units(i64::MAX), None);
    }

    #[test]
    fn plan_request_accepts_camel_case_body() {
        let parsed: CreatePlanRequest = serde_json::from_value(serde_json::json!({
            "productName": "Gold",
            "currency": "usd",
            "amount": 10,
            "interval": "month",
            "intervalCount": 1
        }))
        .unwrap();

        assert_eq!(parsed.product_name, "Gold");
        assert_eq!(parsed.interval_count, 1);
        assert!(parsed.description.is_none());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn plan_request_accepts_amount_as_text() {
        let parsed: CreatePlanRequest = serde_json::from_value(serde_json::json!({
            "productName": "Gold",
            "currency": "INR",
            "amount": "10",
            "interval": "month",
            "intervalCount": 1
        }))
        .unwrap();

        assert_eq!(parsed.amount, 10);
        assert!(parsed.validate().is_ok());

        let err = serde_json::from_value::<CreatePlanRequest>(serde_json::json!({
            "productName": "Gold",
            "currency": "usd",
            "amount": "ten",
            "interval": "month",
            "intervalCount": 1
        }))
        .unwrap_err();
        assert!(err.to_string().contains("ten"));
    }

    #[test]
    fn plan_request_rejects_unknown_currency_and_zero_amounts() {
        let mut req = request();
        req.currency = "eur".to_string();
        assert!(req.validate().is_err());

        let mut req = request();
        req.amount = 0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.interval_count = 0;
        assert!(req.validate().is_err());
    }
}
