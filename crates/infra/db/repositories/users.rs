use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::users},
};
use domain::{
    entities::users::{LinkSubscriptionEntity, UserSubscriptionEntity},
    repositories::users::UserRepository,
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserSubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = users::table
            .filter(users::id.eq(user_id))
            .select(UserSubscriptionEntity::as_select())
            .first::<UserSubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(user)
    }

    async fn link_subscription_by_customer_id(
        &self,
        customer_id: &str,
        link_subscription_entity: LinkSubscriptionEntity,
    ) -> Result<Option<UserSubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = update(users::table)
            .filter(users::customer_id.eq(customer_id))
            .set((
                users::subscription_id.eq(Some(link_subscription_entity.subscription_id)),
                users::plan_id.eq(link_subscription_entity.plan_id),
                users::subscription_expired_at
                    .eq(link_subscription_entity.subscription_expired_at),
                users::is_subscription_expired
                    .eq(link_subscription_entity.is_subscription_expired),
                users::is_plan_cancelled.eq(false),
                users::subscription_cancelled_at.eq(None::<DateTime<Utc>>),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(UserSubscriptionEntity::as_returning())
            .get_result::<UserSubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(user)
    }

    async fn mark_subscription_cancelled(
        &self,
        subscription_id: &str,
        cancelled_at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(users::table)
            .filter(users::subscription_id.eq(subscription_id))
            .set((
                users::subscription_cancelled_at.eq(Some(cancelled_at)),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(updated)
    }

    async fn expire_plan_for_subscription(
        &self,
        subscription_id: &str,
        expired_at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = update(users::table)
            .filter(users::subscription_id.eq(subscription_id))
            .set((
                users::is_plan_cancelled.eq(true),
                users::subscription_expired_at.eq(Some(expired_at)),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(updated)
    }

    async fn mark_subscription_expired(&self, user_id: Uuid) -> Result<UserSubscriptionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let user = update(users::table)
            .filter(users::id.eq(user_id))
            .set((
                users::is_subscription_expired.eq(true),
                users::updated_at.eq(Utc::now()),
            ))
            .returning(UserSubscriptionEntity::as_returning())
            .get_result::<UserSubscriptionEntity>(&mut conn)?;

        Ok(user)
    }
}
