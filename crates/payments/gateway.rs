//! Gateway-neutral contract shared by the Stripe and Razorpay clients.
//!
//! Both clients speak to the live gateway on every call and do not
//! de-duplicate requests. Operations one gateway has no equivalent for fail
//! with [`GatewayError::Unsupported`].

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use thiserror::Error;

use crate::domain::value_objects::enums::{cancel_modes::CancelMode, gateways::GatewayKind};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{message}")]
    NotFound { gateway: GatewayKind, message: String },
    /// Non-2xx answer; `message` is the gateway's own error text.
    #[error("{message}")]
    Api {
        gateway: GatewayKind,
        status: u16,
        message: String,
    },
    #[error("{operation} is not supported by {gateway}")]
    Unsupported {
        gateway: GatewayKind,
        operation: &'static str,
    },
    #[error("{gateway} request failed: {source}")]
    Transport {
        gateway: GatewayKind,
        #[source]
        source: reqwest::Error,
    },
    #[error("{gateway} returned an unexpected payload: {source}")]
    Decode {
        gateway: GatewayKind,
        #[source]
        source: serde_json::Error,
    },
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerAddress {
    pub line1: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

/// Stripe customers carry a postal address, Razorpay customers a phone contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerContact {
    Address(CustomerAddress),
    Phone(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub contact: CustomerContact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub customer_id: String,
    /// Price id on Stripe, plan id on Razorpay.
    pub price_id: String,
    pub trial_days: Option<u32>,
    pub start_at: Option<i64>,
    pub expire_by: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrice {
    pub product_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub interval: String,
    pub interval_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePhase {
    pub price_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSchedule {
    pub customer_id: String,
    pub start_at: i64,
    pub phases: Vec<SchedulePhase>,
}

/// Any gateway object we only need the id of; `raw` is returned to callers verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalObject {
    pub id: String,
    pub raw: serde_json::Value,
}

pub type ExternalCustomer = ExternalObject;
pub type ExternalProduct = ExternalObject;
pub type ExternalPrice = ExternalObject;
pub type ExternalSchedule = ExternalObject;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalSubscription {
    pub id: String,
    pub gateway: GatewayKind,
    pub status: String,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: Option<i64>,
    pub cancel_at: Option<i64>,
    pub cancel_at_period_end: bool,
    pub raw: serde_json::Value,
}

#[async_trait]
#[automock]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, new_customer: NewCustomer) -> GatewayResult<ExternalCustomer>;

    async fn create_subscription(
        &self,
        new_subscription: NewSubscription,
    ) -> GatewayResult<ExternalSubscription>;

    async fn fetch_subscription(&self, subscription_id: &str) -> GatewayResult<ExternalSubscription>;

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        mode: CancelMode,
    ) -> GatewayResult<ExternalSubscription>;

    async fn create_product(&self, name: &str) -> GatewayResult<ExternalProduct>;

    async fn create_price(&self, new_price: NewPrice) -> GatewayResult<ExternalPrice>;

    async fn disable_product(&self, product_id: &str) -> GatewayResult<()>;

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> GatewayResult<()>;

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> GatewayResult<()>;

    async fn create_subscription_schedule(
        &self,
        new_schedule: NewSchedule,
    ) -> GatewayResult<ExternalSchedule>;
}
