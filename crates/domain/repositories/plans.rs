use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    entities::plans::{InsertPlanEntity, PlanEntity},
    value_objects::enums::gateways::GatewayKind,
};

#[async_trait]
#[automock]
pub trait PlanRepository {
    async fn insert_plan(&self, insert_plan_entity: InsertPlanEntity) -> Result<PlanEntity>;

    /// Plans for `gateway` that are not disabled.
    async fn list_active_plans(&self, gateway: GatewayKind) -> Result<Vec<PlanEntity>>;

    /// Flips `is_disabled` on every plan for the product; returns the rows touched.
    async fn disable_by_product_id(&self, external_product_id: &str) -> Result<usize>;
}
