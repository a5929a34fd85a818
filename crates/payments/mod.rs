pub mod gateway;
pub mod razorpay_client;
pub mod stripe_client;

use std::sync::Arc;

use crate::domain::value_objects::enums::gateways::GatewayKind;
use gateway::PaymentGateway;

/// One client per supported gateway, selected by [`GatewayKind`].
#[derive(Clone)]
pub struct Gateways {
    stripe: Arc<dyn PaymentGateway>,
    razorpay: Arc<dyn PaymentGateway>,
}

impl Gateways {
    pub fn new(stripe: Arc<dyn PaymentGateway>, razorpay: Arc<dyn PaymentGateway>) -> Self {
        Self { stripe, razorpay }
    }

    pub fn get(&self, kind: GatewayKind) -> Arc<dyn PaymentGateway> {
        match kind {
            GatewayKind::Stripe => Arc::clone(&self.stripe),
            GatewayKind::Razorpay => Arc::clone(&self.razorpay),
        }
    }

    pub fn stripe(&self) -> Arc<dyn PaymentGateway> {
        self.get(GatewayKind::Stripe)
    }

    pub fn razorpay(&self) -> Arc<dyn PaymentGateway> {
        self.get(GatewayKind::Razorpay)
    }
}
