use std::sync::Arc;

use crates::{
    domain::{
        entities::users::LinkSubscriptionEntity,
        repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
        value_objects::subscriptions::epoch_to_utc,
    },
    payments::{
        gateway::PaymentGateway,
        stripe_client::{StripeEvent, parse_event, verify_webhook_signature},
    },
};
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::subscriptions::{SubscriptionError, UseCaseResult, subscription_record};

pub const SCHEDULE_UPDATED_EVENT: &str = "subscription_schedule.updated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Reconciled {
        subscription_id: String,
        user_id: Option<Uuid>,
    },
    Ignored {
        event_type: String,
    },
    /// Signature or payload could not be trusted; nothing was written.
    Rejected,
    Failed {
        message: String,
    },
}

pub struct StripeWebhookUseCase<S, U>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    user_repo: Arc<U>,
    stripe: Arc<dyn PaymentGateway>,
    webhook_secret: Option<String>,
}

impl<S, U> StripeWebhookUseCase<S, U>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(
        subscription_repo: Arc<S>,
        user_repo: Arc<U>,
        stripe: Arc<dyn PaymentGateway>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            stripe,
            webhook_secret,
        }
    }

    /// Never fails: the caller acknowledges every delivery regardless of outcome.
    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> WebhookOutcome {
        let event = match self.read_event(payload, signature) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "stripe webhook: event rejected");
                return WebhookOutcome::Rejected;
            }
        };

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            "stripe webhook: event received"
        );

        match event.type_.as_str() {
            SCHEDULE_UPDATED_EVENT => match self.reconcile_schedule_updated(&event).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(
                        event_id = ?event.id,
                        error = %err,
                        "stripe webhook: reconciliation failed"
                    );
                    WebhookOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            },
            other => {
                debug!(event_type = %other, "stripe webhook: unhandled event type");
                WebhookOutcome::Ignored {
                    event_type: other.to_string(),
                }
            }
        }
    }

    fn read_event(&self, payload: &[u8], signature: Option<&str>) -> anyhow::Result<StripeEvent> {
        match (&self.webhook_secret, signature) {
            (Some(secret), Some(signature)) => verify_webhook_signature(secret, payload, signature),
            (Some(_), None) => Err(anyhow::anyhow!("missing Stripe-Signature header")),
            (None, _) => parse_event(payload),
        }
    }

    /// Re-reads the subscription from Stripe, re-attaches it to the owning
    /// user and upserts the local record. Replays converge on one record.
    async fn reconcile_schedule_updated(&self, event: &StripeEvent) -> UseCaseResult<WebhookOutcome> {
        let subscription_id = event
            .data
            .object
            .get("subscription")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                SubscriptionError::Validation(
                    "schedule event carries no subscription id".to_string(),
                )
            })?
            .to_string();

        let subscription = self.stripe.fetch_subscription(&subscription_id).await?;

        let user = match subscription.customer_id.as_deref() {
            Some(customer_id) => self
                .user_repo
                .link_subscription_by_customer_id(
                    customer_id,
                    LinkSubscriptionEntity::new(
                        subscription.id.clone(),
                        subscription.price_id.clone(),
                        subscription.current_period_end.and_then(epoch_to_utc),
                        Utc::now(),
                    ),
                )
                .await
                .map_err(|err| {
                    error!(
                        %subscription_id,
                        %customer_id,
                        db_error = ?err,
                        "stripe webhook: failed to link subscription to user"
                    );
                    SubscriptionError::Internal(err)
                })?,
            None => None,
        };

        let user_id = user.map(|user| user.id);
        if user_id.is_none() {
            warn!(
                %subscription_id,
                customer_id = ?subscription.customer_id,
                "stripe webhook: no user for customer, saving unlinked"
            );
        }

        self.subscription_repo
            .upsert_subscription(subscription_record(&subscription, user_id))
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "stripe webhook: failed to upsert subscription");
                SubscriptionError::Internal(err)
            })?;

        info!(%subscription_id, user_id = ?user_id, "stripe webhook: subscription reconciled");
        Ok(WebhookOutcome::Reconciled {
            subscription_id,
            user_id,
        })
    }
}
