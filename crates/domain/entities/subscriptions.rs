use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscriptions;

/// Local mirror of one gateway subscription. `snapshot` holds the raw gateway
/// payload as last fetched; the other columns are the normalized view of it.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub external_subscription_id: String,
    pub gateway: String,
    pub status: String,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_cancel: bool,
    pub cancel_at: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
    pub snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload keyed by `external_subscription_id`.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub external_subscription_id: String,
    pub gateway: String,
    pub status: String,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_cancel: bool,
    pub cancel_at: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
    pub snapshot: serde_json::Value,
}

/// Column updates applied when an upsert hits an existing row. `None` columns
/// are left untouched, so an unlinked re-sync never clears a user link written
/// earlier. `cancel_at` is always written because it must follow `is_cancel`.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct ResyncSubscriptionEntity {
    pub gateway: String,
    pub status: String,
    pub customer_id: Option<String>,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_cancel: bool,
    pub cancel_at: Option<Option<DateTime<Utc>>>,
    pub user_id: Option<Uuid>,
    pub snapshot: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl InsertSubscriptionEntity {
    pub fn resync_changeset(&self, updated_at: DateTime<Utc>) -> ResyncSubscriptionEntity {
        ResyncSubscriptionEntity {
            gateway: self.gateway.clone(),
            status: self.status.clone(),
            customer_id: self.customer_id.clone(),
            price_id: self.price_id.clone(),
            current_period_end: self.current_period_end,
            is_cancel: self.is_cancel,
            cancel_at: Some(self.cancel_at),
            user_id: self.user_id,
            snapshot: self.snapshot.clone(),
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(cancel_at: Option<DateTime<Utc>>) -> InsertSubscriptionEntity {
        InsertSubscriptionEntity {
            external_subscription_id: "sub_1".to_string(),
            gateway: "stripe".to_string(),
            status: "active".to_string(),
            customer_id: Some("cus_1".to_string()),
            price_id: Some("price_1".to_string()),
            current_period_end: None,
            is_cancel: cancel_at.is_some(),
            cancel_at,
            user_id: None,
            snapshot: serde_json::json!({ "id": "sub_1" }),
        }
    }

    #[test]
    fn resync_clears_cancel_at_when_no_longer_cancelling() {
        let now = Utc::now();
        let changeset = record(None).resync_changeset(now);

        assert!(!changeset.is_cancel);
        assert_eq!(changeset.cancel_at, Some(None));
        assert_eq!(changeset.updated_at, now);
    }

    #[test]
    fn resync_keeps_unlinked_user_untouched() {
        let cancel_at = Utc.timestamp_opt(1_700_000_000, 0).single();
        let changeset = record(cancel_at).resync_changeset(Utc::now());

        assert_eq!(changeset.cancel_at, Some(cancel_at));
        assert_eq!(changeset.user_id, None);
    }
}
