use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::users;

/// The subscription-related slice of a user row. The row itself belongs to
/// the auth side; this subsystem only writes the fields below.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserSubscriptionEntity {
    pub id: Uuid,
    pub email: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub plan_id: Option<String>,
    pub subscription_expired_at: Option<DateTime<Utc>>,
    pub is_subscription_expired: bool,
    pub is_plan_cancelled: bool,
    pub subscription_cancelled_at: Option<DateTime<Utc>>,
}

impl UserSubscriptionEntity {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.subscription_expired_at
            .map(|expired_at| now > expired_at)
            .unwrap_or(false)
    }
}

/// Fields written when a gateway subscription is (re)attached to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSubscriptionEntity {
    pub subscription_id: String,
    pub plan_id: Option<String>,
    pub subscription_expired_at: Option<DateTime<Utc>>,
    pub is_subscription_expired: bool,
}

impl LinkSubscriptionEntity {
    /// The expired flag is derived from the new expiry, so a renewal clears it.
    pub fn new(
        subscription_id: String,
        plan_id: Option<String>,
        subscription_expired_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            subscription_id,
            plan_id,
            subscription_expired_at,
            is_subscription_expired: subscription_expired_at
                .map(|expired_at| now > expired_at)
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn renewed_link_is_not_expired() {
        let now = Utc::now();
        let link = LinkSubscriptionEntity::new(
            "sub_1".to_string(),
            Some("price_1".to_string()),
            Some(now + Duration::days(30)),
            now,
        );
        assert!(!link.is_subscription_expired);
    }

    #[test]
    fn lapsed_or_missing_expiry_is_derived() {
        let now = Utc::now();
        let lapsed = LinkSubscriptionEntity::new(
            "sub_1".to_string(),
            None,
            Some(now - Duration::days(1)),
            now,
        );
        assert!(lapsed.is_subscription_expired);

        let open_ended = LinkSubscriptionEntity::new("sub_1".to_string(), None, None, now);
        assert!(!open_ended.is_subscription_expired);
    }
}
