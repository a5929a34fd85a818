use std::sync::Arc;

use crates::{
    domain::{
        entities::plans::InsertPlanEntity,
        repositories::plans::PlanRepository,
        value_objects::{
            enums::gateways::GatewayKind,
            plans::{CreatePlanRequest, PlanDto, STRIPE_TRIAL_DAYS, to_minor_units},
        },
    },
    payments::gateway::{NewPrice, PaymentGateway},
};
use tracing::{error, info};

use super::subscriptions::{SubscriptionError, UseCaseResult};

pub struct PlanUseCase<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    plan_repo: Arc<P>,
    stripe: Arc<dyn PaymentGateway>,
}

impl<P> PlanUseCase<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(plan_repo: Arc<P>, stripe: Arc<dyn PaymentGateway>) -> Self {
        Self { plan_repo, stripe }
    }

    /// Creates the product and its recurring price on Stripe, then records the
    /// plan locally. The gateway is the only uniqueness check.
    pub async fn create_plan(&self, request: CreatePlanRequest) -> UseCaseResult<PlanDto> {
        let amount_minor = to_minor_units(request.amount).ok_or_else(|| {
            SubscriptionError::Validation(format!("\"amount\" {} is too large", request.amount))
        })?;

        let product = self.stripe.create_product(&request.product_name).await?;
        let price = self
            .stripe
            .create_price(NewPrice {
                product_id: product.id.clone(),
                amount_minor,
                currency: request.currency.clone(),
                interval: request.interval.clone(),
                interval_count: request.interval_count,
            })
            .await?;

        let interval_count = i32::try_from(request.interval_count).map_err(|_| {
            SubscriptionError::Validation("\"intervalCount\" is too large".to_string())
        })?;

        let plan = self
            .plan_repo
            .insert_plan(InsertPlanEntity {
                gateway: GatewayKind::Stripe.to_string(),
                name: request.product_name,
                external_product_id: product.id,
                external_price_id: price.id,
                currency: request.currency,
                amount: amount_minor,
                billing_interval: request.interval,
                interval_count,
                trial_days: STRIPE_TRIAL_DAYS,
                is_disabled: false,
                description: request.description,
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "plans: failed to insert plan");
                SubscriptionError::Internal(err)
            })?;

        info!(
            plan_id = %plan.id,
            product_id = %plan.external_product_id,
            price_id = %plan.external_price_id,
            "plans: plan created"
        );
        Ok(PlanDto::from(plan))
    }

    pub async fn list_plans(&self, gateway: &str) -> UseCaseResult<Vec<PlanDto>> {
        let gateway = GatewayKind::from_str(gateway).ok_or_else(|| {
            SubscriptionError::Validation(format!(
                "\"gateway\" must be one of [stripe, razorpay], got \"{gateway}\""
            ))
        })?;

        let plans = self
            .plan_repo
            .list_active_plans(gateway)
            .await
            .map_err(|err| {
                error!(%gateway, db_error = ?err, "plans: failed to list active plans");
                SubscriptionError::Internal(err)
            })?;

        let plan_count = plans.len();
        info!(%gateway, plan_count, "plans: active plans loaded");
        Ok(plans.into_iter().map(PlanDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::subscriptions::SubscriptionUseCase;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use crates::{
        domain::{
            entities::plans::PlanEntity,
            repositories::{
                plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
                users::MockUserRepository,
            },
            value_objects::subscriptions::DisableProductRequest,
        },
        payments::{
            Gateways,
            gateway::{ExternalObject, MockPaymentGateway},
        },
    };
    use mockall::predicate::eq;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct InMemoryPlans {
        rows: Mutex<Vec<PlanEntity>>,
    }

    #[async_trait]
    impl PlanRepository for InMemoryPlans {
        async fn insert_plan(&self, plan: InsertPlanEntity) -> Result<PlanEntity> {
            let now = Utc::now();
            let row = PlanEntity {
                id: Uuid::new_v4(),
                gateway: plan.gateway,
                name: plan.name,
                external_product_id: plan.external_product_id,
                external_price_id: plan.external_price_id,
                currency: plan.currency,
                amount: plan.amount,
                billing_interval: plan.billing_interval,
                interval_count: plan.interval_count,
                trial_days: plan.trial_days,
                is_disabled: plan.is_disabled,
                description: plan.description,
                created_at: now,
                updated_at: now,
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn list_active_plans(&self, gateway: GatewayKind) -> Result<Vec<PlanEntity>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|plan| plan.gateway == gateway.as_str() && !plan.is_disabled)
                .cloned()
                .collect())
        }

        async fn disable_by_product_id(&self, external_product_id: &str) -> Result<usize> {
            let mut rows = self.rows.lock().unwrap();
            let mut touched = 0;
            for plan in rows
                .iter_mut()
                .filter(|plan| plan.external_product_id == external_product_id)
            {
                plan.is_disabled = true;
                touched += 1;
            }
            Ok(touched)
        }
    }

    fn stripe_catalog_mock() -> MockPaymentGateway {
        let mut stripe = MockPaymentGateway::new();
        stripe
            .expect_create_product()
            .withf(|name| name == "Gold")
            .returning(|_| {
                Box::pin(async {
                    Ok(ExternalObject {
                        id: "prod_gold".to_string(),
                        raw: json!({ "id": "prod_gold" }),
                    })
                })
            });
        stripe
            .expect_create_price()
            .withf(|price| {
                price.amount_minor == 1000
                    && price.product_id == "prod_gold"
                    && price.currency == "usd"
                    && price.interval == "month"
                    && price.interval_count == 1
            })
            .returning(|_| {
                Box::pin(async {
                    Ok(ExternalObject {
                        id: "price_gold".to_string(),
                        raw: json!({ "id": "price_gold" }),
                    })
                })
            });
        stripe
    }

    fn gold_request() -> CreatePlanRequest {
        CreatePlanRequest {
            product_name: "Gold".to_string(),
            currency: "usd".to_string(),
            amount: 10,
            interval: "month".to_string(),
            interval_count: 1,
            description: Some("Everything".to_string()),
        }
    }

    #[tokio::test]
    async fn create_plan_stores_minor_units_and_trial() {
        let mut plans = MockPlanRepository::new();
        plans
            .expect_insert_plan()
            .withf(|plan| {
                plan.amount == 1000
                    && plan.trial_days == 14
                    && plan.gateway == "stripe"
                    && !plan.is_disabled
                    && plan.external_price_id == "price_gold"
            })
            .times(1)
            .returning(|plan| {
                Box::pin(async move {
                    Ok(PlanEntity {
                        id: Uuid::new_v4(),
                        gateway: plan.gateway,
                        name: plan.name,
                        external_product_id: plan.external_product_id,
                        external_price_id: plan.external_price_id,
                        currency: plan.currency,
                        amount: plan.amount,
                        billing_interval: plan.billing_interval,
                        interval_count: plan.interval_count,
                        trial_days: plan.trial_days,
                        is_disabled: plan.is_disabled,
                        description: plan.description,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    })
                })
            });

        let usecase = PlanUseCase::new(Arc::new(plans), Arc::new(stripe_catalog_mock()));
        let plan = usecase.create_plan(gold_request()).await.unwrap();

        assert_eq!(plan.amount, 1000);
        assert_eq!(plan.product_id, "prod_gold");
    }

    #[tokio::test]
    async fn list_plans_rejects_unknown_gateway() {
        let mut plans = MockPlanRepository::new();
        plans.expect_list_active_plans().times(0);

        let usecase = PlanUseCase::new(Arc::new(plans), Arc::new(MockPaymentGateway::new()));
        let err = usecase.list_plans("paypal").await.unwrap_err();

        assert!(matches!(err, SubscriptionError::Validation(_)));
    }

    #[tokio::test]
    async fn list_plans_accepts_gateway_in_any_case() {
        let mut plans = MockPlanRepository::new();
        plans
            .expect_list_active_plans()
            .with(eq(GatewayKind::Razorpay))
            .times(1)
            .returning(|_| Box::pin(async { Ok(vec![]) }));

        let usecase = PlanUseCase::new(Arc::new(plans), Arc::new(MockPaymentGateway::new()));
        assert!(usecase.list_plans("RazorPay").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_plan_drops_out_of_listing() {
        let catalog = Arc::new(InMemoryPlans::default());

        let mut stripe = stripe_catalog_mock();
        stripe
            .expect_disable_product()
            .withf(|id| id == "prod_gold")
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));
        let stripe: Arc<dyn PaymentGateway> = Arc::new(stripe);

        let plans_usecase = PlanUseCase::new(Arc::clone(&catalog), Arc::clone(&stripe));
        let created = plans_usecase.create_plan(gold_request()).await.unwrap();
        assert!(!created.is_disabled);

        let listed = plans_usecase.list_plans("stripe").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].price_id, "price_gold");
        assert!(!listed[0].is_disabled);

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_by_price_id()
            .returning(|_| Box::pin(async { Ok(vec![]) }));
        let subscriptions_usecase = SubscriptionUseCase::new(
            Arc::clone(&catalog),
            Arc::new(subscriptions),
            Arc::new(MockUserRepository::new()),
            Gateways::new(stripe, Arc::new(MockPaymentGateway::new())),
        );

        let report = subscriptions_usecase
            .disable_product(DisableProductRequest {
                product_id: "prod_gold".to_string(),
                price_id: "price_gold".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(report.affected_subscriptions, 0);
        assert!(report.failures.is_empty());

        assert!(plans_usecase.list_plans("stripe").await.unwrap().is_empty());
    }
}
