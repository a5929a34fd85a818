use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    /// Inserts or refreshes the record for `external_subscription_id`.
    async fn upsert_subscription(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
    ) -> Result<SubscriptionEntity>;

    async fn find_by_price_id(&self, price_id: &str) -> Result<Vec<SubscriptionEntity>>;

    async fn mark_cancel_scheduled(
        &self,
        external_subscription_id: &str,
        cancel_at: Option<DateTime<Utc>>,
    ) -> Result<Option<SubscriptionEntity>>;

    async fn update_status_by_external_id(
        &self,
        external_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<()>;

    async fn delete_by_external_id(&self, external_subscription_id: &str) -> Result<usize>;
}
