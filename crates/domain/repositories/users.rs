use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{LinkSubscriptionEntity, UserSubscriptionEntity};

#[async_trait]
#[automock]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserSubscriptionEntity>>;

    /// Attaches a subscription to the user owning `customer_id`, clears any
    /// previous cancellation markers and rewrites the expired flag.
    async fn link_subscription_by_customer_id(
        &self,
        customer_id: &str,
        link_subscription_entity: LinkSubscriptionEntity,
    ) -> Result<Option<UserSubscriptionEntity>>;

    async fn mark_subscription_cancelled(
        &self,
        subscription_id: &str,
        cancelled_at: DateTime<Utc>,
    ) -> Result<usize>;

    /// Sets `is_plan_cancelled` and the expiry on every holder of `subscription_id`.
    async fn expire_plan_for_subscription(
        &self,
        subscription_id: &str,
        expired_at: DateTime<Utc>,
    ) -> Result<usize>;

    async fn mark_subscription_expired(&self, user_id: Uuid) -> Result<UserSubscriptionEntity>;
}
