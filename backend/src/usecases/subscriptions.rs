use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::{subscriptions::InsertSubscriptionEntity, users::UserSubscriptionEntity},
        repositories::{
            plans::PlanRepository, subscriptions::SubscriptionRepository, users::UserRepository,
        },
        value_objects::{
            enums::{
                cancel_modes::CancelMode, gateways::GatewayKind,
                subscription_statuses::SubscriptionStatus,
            },
            subscriptions::{
                CancelSubscriptionQuery, DisableFailure, DisableProductReport, DisableProductRequest,
                MessageDto, PlanChangeDto, RazorpayCustomerRequest, RazorpaySubscriptionRequest,
                StripeCustomerRequest, StripeSubscriptionRequest, SubscriptionDto,
                UpdateStripeSubscriptionRequest, epoch_to_utc,
            },
        },
    },
    payments::{
        Gateways,
        gateway::{
            CustomerAddress, CustomerContact, ExternalSubscription, GatewayError, NewCustomer,
            NewSchedule, NewSubscription, PaymentGateway, SchedulePhase,
        },
    },
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const RAZORPAY_CONFIRMED_STATUS: &str = "authenticated";

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    Validation(String),
    #[error("Subscription amount is not paid.")]
    NotAuthenticated,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Something went wrong while cancelling subscription. Please try again.")]
    CancellationFailed,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::Validation(_)
            | SubscriptionError::NotAuthenticated
            | SubscriptionError::CancellationFailed => StatusCode::BAD_REQUEST,
            SubscriptionError::Gateway(GatewayError::NotFound { .. })
            | SubscriptionError::NotFound(_) => StatusCode::NOT_FOUND,
            SubscriptionError::Gateway(
                GatewayError::Transport { .. } | GatewayError::Decode { .. },
            ) => StatusCode::BAD_GATEWAY,
            SubscriptionError::Gateway(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// Normalized store record for a gateway subscription. `user_id` is only set
/// when the owner is known.
pub(crate) fn subscription_record(
    external: &ExternalSubscription,
    user_id: Option<Uuid>,
) -> InsertSubscriptionEntity {
    let status = SubscriptionStatus::from_gateway(
        external.gateway,
        &external.status,
        external.cancel_at_period_end,
    );

    InsertSubscriptionEntity {
        external_subscription_id: external.id.clone(),
        gateway: external.gateway.to_string(),
        status: status.to_string(),
        customer_id: external.customer_id.clone(),
        price_id: external.price_id.clone(),
        current_period_end: external.current_period_end.and_then(epoch_to_utc),
        is_cancel: external.cancel_at_period_end,
        cancel_at: external.cancel_at.and_then(epoch_to_utc),
        user_id,
        snapshot: external.raw.clone(),
    }
}

pub struct SubscriptionUseCase<P, S, U>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<S>,
    user_repo: Arc<U>,
    gateways: Gateways,
}

impl<P, S, U> SubscriptionUseCase<P, S, U>
where
    P: PlanRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(
        plan_repo: Arc<P>,
        subscription_repo: Arc<S>,
        user_repo: Arc<U>,
        gateways: Gateways,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            user_repo,
            gateways,
        }
    }

    /// Loads the authenticated caller and refreshes the derived expiry flag.
    pub async fn resolve_caller(&self, user_id: Uuid) -> UseCaseResult<UserSubscriptionEntity> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load caller");
                SubscriptionError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "subscriptions: caller not found");
                SubscriptionError::NotFound("User not found.".to_string())
            })?;

        self.refresh_subscription_expiry(user, Utc::now()).await
    }

    pub async fn refresh_subscription_expiry(
        &self,
        user: UserSubscriptionEntity,
        now: DateTime<Utc>,
    ) -> UseCaseResult<UserSubscriptionEntity> {
        if user.is_subscription_expired || !user.is_past_expiry(now) {
            return Ok(user);
        }

        let user_id = user.id;
        info!(%user_id, "subscriptions: marking subscription expired");
        self.user_repo
            .mark_subscription_expired(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to mark subscription expired");
                SubscriptionError::Internal(err)
            })
    }

    pub async fn create_stripe_customer(
        &self,
        request: StripeCustomerRequest,
    ) -> UseCaseResult<serde_json::Value> {
        let customer = self
            .gateways
            .stripe()
            .create_customer(NewCustomer {
                name: request.name,
                email: request.email,
                contact: CustomerContact::Address(CustomerAddress {
                    line1: request.address_line,
                    postal_code: request.postal_code,
                    city: request.city,
                    country: request.country,
                }),
            })
            .await?;

        info!(customer_id = %customer.id, "subscriptions: stripe customer created");
        Ok(customer.raw)
    }

    pub async fn create_razorpay_customer(
        &self,
        request: RazorpayCustomerRequest,
    ) -> UseCaseResult<serde_json::Value> {
        let customer = self
            .gateways
            .razorpay()
            .create_customer(NewCustomer {
                name: request.name,
                email: request.email,
                contact: CustomerContact::Phone(request.contact),
            })
            .await?;

        info!(customer_id = %customer.id, "subscriptions: razorpay customer created");
        Ok(customer.raw)
    }

    /// The created subscription is returned as-is; it is only persisted once
    /// confirmed.
    pub async fn create_razorpay_subscription(
        &self,
        request: RazorpaySubscriptionRequest,
    ) -> UseCaseResult<serde_json::Value> {
        let subscription = self
            .gateways
            .razorpay()
            .create_subscription(NewSubscription {
                customer_id: request.customer_id,
                price_id: request.plan_id,
                trial_days: None,
                start_at: Some(request.start_at),
                expire_by: Some(request.expire_by),
                note: request.note_key,
            })
            .await?;

        info!(
            subscription_id = %subscription.id,
            "subscriptions: razorpay subscription created"
        );
        Ok(subscription.raw)
    }

    pub async fn confirm_razorpay_subscription(
        &self,
        subscription_id: &str,
    ) -> UseCaseResult<SubscriptionDto> {
        let subscription = self
            .gateways
            .razorpay()
            .fetch_subscription(subscription_id)
            .await?;

        if subscription.status != RAZORPAY_CONFIRMED_STATUS {
            warn!(
                %subscription_id,
                status = %subscription.status,
                "subscriptions: razorpay subscription not authenticated"
            );
            return Err(SubscriptionError::NotAuthenticated);
        }

        let record = self
            .subscription_repo
            .upsert_subscription(subscription_record(&subscription, None))
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to save confirmed subscription");
                SubscriptionError::Internal(err)
            })?;

        info!(%subscription_id, "subscriptions: razorpay subscription confirmed");
        Ok(SubscriptionDto::from(record))
    }

    /// Card flow: attach the payment method, make it the default, then
    /// subscribe. Steps are not rolled back if a later one fails.
    pub async fn create_stripe_subscription(
        &self,
        request: StripeSubscriptionRequest,
    ) -> UseCaseResult<SubscriptionDto> {
        let stripe = self.gateways.stripe();
        let customer_id = request.customer_id;

        stripe
            .attach_payment_method(&customer_id, &request.payment_id)
            .await?;
        stripe
            .set_default_payment_method(&customer_id, &request.payment_id)
            .await?;

        let subscription = stripe
            .create_subscription(NewSubscription {
                customer_id: customer_id.clone(),
                price_id: request.price_id,
                trial_days: Some(request.trial_days),
                start_at: None,
                expire_by: None,
                note: None,
            })
            .await?;

        let mut record = subscription_record(&subscription, None);
        record.is_cancel = false;

        let saved = self
            .subscription_repo
            .upsert_subscription(record)
            .await
            .map_err(|err| {
                error!(
                    %customer_id,
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "subscriptions: failed to save stripe subscription"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            %customer_id,
            subscription_id = %subscription.id,
            "subscriptions: stripe subscription created"
        );
        Ok(SubscriptionDto::from(saved))
    }

    /// Cancels at period end and schedules the new price to start exactly at
    /// the boundary.
    pub async fn update_stripe_subscription(
        &self,
        request: UpdateStripeSubscriptionRequest,
    ) -> UseCaseResult<PlanChangeDto> {
        let stripe = self.gateways.stripe();
        let subscription_id = request.subscription_id;

        let cancelled = stripe
            .cancel_subscription(&subscription_id, CancelMode::EndOfPeriod)
            .await?;

        let boundary = cancelled
            .cancel_at
            .or(cancelled.current_period_end)
            .ok_or_else(|| {
                error!(%subscription_id, "subscriptions: stripe returned no cancellation time");
                SubscriptionError::Internal(anyhow::anyhow!(
                    "subscription {subscription_id} has no cancellation time"
                ))
            })?;

        let schedule = stripe
            .create_subscription_schedule(NewSchedule {
                customer_id: request.customer_id,
                start_at: boundary,
                phases: vec![SchedulePhase {
                    price_id: request.price_id,
                }],
            })
            .await?;

        let cancel_at = epoch_to_utc(boundary);
        let updated = self
            .subscription_repo
            .mark_cancel_scheduled(&subscription_id, cancel_at)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to mark cancel scheduled");
                SubscriptionError::Internal(err)
            })?;

        if updated.is_none() {
            warn!(%subscription_id, "subscriptions: no local record for scheduled cancellation");
        }

        info!(
            %subscription_id,
            schedule_id = %schedule.id,
            cancel_at = ?cancel_at,
            "subscriptions: plan change scheduled"
        );

        Ok(PlanChangeDto {
            cancel_subscription: cancelled.raw,
            updated_subscription: schedule.raw,
        })
    }

    pub async fn cancel_subscription(
        &self,
        query: CancelSubscriptionQuery,
    ) -> UseCaseResult<MessageDto> {
        let gateway = query.gateway_kind().ok_or_else(|| {
            SubscriptionError::Validation(format!("Unsupported gateway: {}", query.gateway))
        })?;
        let subscription_id = query.subscription_id;

        let cancelled = self
            .gateways
            .get(gateway)
            .cancel_subscription(&subscription_id, CancelMode::Immediate)
            .await?;

        if cancelled.status != gateway.cancelled_status() {
            warn!(
                %subscription_id,
                %gateway,
                status = %cancelled.status,
                "subscriptions: gateway did not confirm cancellation"
            );
            return Err(SubscriptionError::CancellationFailed);
        }

        self.subscription_repo
            .delete_by_external_id(&subscription_id)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to delete cancelled subscription");
                SubscriptionError::Internal(err)
            })?;

        let cancelled_at = Utc::now();
        let users = self
            .user_repo
            .mark_subscription_cancelled(&subscription_id, cancelled_at)
            .await
            .map_err(|err| {
                error!(%subscription_id, db_error = ?err, "subscriptions: failed to stamp user cancellation");
                SubscriptionError::Internal(err)
            })?;

        info!(%subscription_id, %gateway, users, "subscriptions: subscription cancelled");
        Ok(MessageDto {
            message: "Subscription canceled.".to_string(),
        })
    }

    pub async fn fetch_current_subscription(
        &self,
        caller: &UserSubscriptionEntity,
    ) -> UseCaseResult<serde_json::Value> {
        let subscription_id = caller.subscription_id.as_deref().ok_or_else(|| {
            SubscriptionError::NotFound("No subscription found for this user.".to_string())
        })?;

        let subscription = self
            .gateways
            .stripe()
            .fetch_subscription(subscription_id)
            .await?;

        Ok(subscription.raw)
    }

    /// Deactivates the product, disables its plans and force-expires every
    /// holder of a subscription on `price_id`. Each subscription is handled
    /// in its own task; failures are reported, not propagated.
    pub async fn disable_product(
        &self,
        request: DisableProductRequest,
    ) -> UseCaseResult<DisableProductReport> {
        let product_id = request.product_id;
        let price_id = request.price_id;

        self.gateways.stripe().disable_product(&product_id).await?;

        let plans = self
            .plan_repo
            .disable_by_product_id(&product_id)
            .await
            .map_err(|err| {
                error!(%product_id, db_error = ?err, "subscriptions: failed to disable plans");
                SubscriptionError::Internal(err)
            })?;

        let subscriptions = self
            .subscription_repo
            .find_by_price_id(&price_id)
            .await
            .map_err(|err| {
                error!(%price_id, db_error = ?err, "subscriptions: failed to load subscriptions for price");
                SubscriptionError::Internal(err)
            })?;

        let affected_subscriptions = subscriptions.len();
        info!(
            %product_id,
            %price_id,
            plans,
            affected_subscriptions,
            "subscriptions: expiring holders of disabled product"
        );

        let mut handles: Vec<(String, JoinHandle<UseCaseResult<usize>>)> =
            Vec::with_capacity(affected_subscriptions);
        for subscription in subscriptions {
            let gateway_kind =
                GatewayKind::from_str(&subscription.gateway).unwrap_or(GatewayKind::Stripe);
            let gateway = self.gateways.get(gateway_kind);
            let subscription_repo = Arc::clone(&self.subscription_repo);
            let user_repo = Arc::clone(&self.user_repo);
            let subscription_id = subscription.external_subscription_id;

            let task_subscription_id = subscription_id.clone();
            let handle = tokio::spawn(async move {
                expire_holders(gateway, subscription_repo, user_repo, task_subscription_id).await
            });
            handles.push((subscription_id, handle));
        }

        let mut updated_users = 0;
        let mut failures = Vec::new();
        for (subscription_id, handle) in handles {
            let message = match handle.await {
                Ok(Ok(users)) => {
                    updated_users += users;
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(join_err) => format!("task failed: {join_err}"),
            };

            warn!(%subscription_id, %message, "subscriptions: failed to expire holders");
            failures.push(DisableFailure {
                subscription_id,
                message,
            });
        }

        Ok(DisableProductReport {
            success_message: "Product disabled successfully.".to_string(),
            product_id,
            price_id,
            affected_subscriptions,
            updated_users,
            failures,
        })
    }
}

async fn expire_holders<S, U>(
    gateway: Arc<dyn PaymentGateway>,
    subscription_repo: Arc<S>,
    user_repo: Arc<U>,
    subscription_id: String,
) -> UseCaseResult<usize>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    let subscription = gateway.fetch_subscription(&subscription_id).await?;

    let expired_at = subscription
        .current_period_end
        .and_then(epoch_to_utc)
        .ok_or_else(|| {
            SubscriptionError::Internal(anyhow::anyhow!(
                "subscription {subscription_id} has no current period end"
            ))
        })?;

    let users = user_repo
        .expire_plan_for_subscription(&subscription_id, expired_at)
        .await
        .map_err(|err| {
            error!(%subscription_id, db_error = ?err, "subscriptions: failed to expire plan for holders");
            SubscriptionError::Internal(err)
        })?;

    subscription_repo
        .update_status_by_external_id(&subscription_id, SubscriptionStatus::Disabled)
        .await
        .map_err(|err| {
            error!(%subscription_id, db_error = ?err, "subscriptions: failed to mark subscription disabled");
            SubscriptionError::Internal(err)
        })?;

    Ok(users)
}
