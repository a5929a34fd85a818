use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::plans;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub gateway: String,
    pub name: String,
    pub external_product_id: String,
    pub external_price_id: String,
    pub currency: String,
    /// Minor units (cents, paise).
    pub amount: i64,
    pub billing_interval: String,
    pub interval_count: i32,
    pub trial_days: i32,
    pub is_disabled: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = plans)]
pub struct InsertPlanEntity {
    pub gateway: String,
    pub name: String,
    pub external_product_id: String,
    pub external_price_id: String,
    pub currency: String,
    pub amount: i64,
    pub billing_interval: String,
    pub interval_count: i32,
    pub trial_days: i32,
    pub is_disabled: bool,
    pub description: Option<String>,
}
