use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::gateways::GatewayKind;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    PendingConfirmation,
    Active,
    CancelScheduled,
    Cancelled,
    Disabled,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            SubscriptionStatus::PendingConfirmation => "pending_confirmation",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::CancelScheduled => "cancel_scheduled",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Disabled => "disabled",
        };
        write!(f, "{}", status)
    }
}

impl SubscriptionStatus {
    /// Maps a raw gateway status onto the local lifecycle.
    pub fn from_gateway(gateway: GatewayKind, gateway_status: &str, cancel_at_period_end: bool) -> Self {
        let status = match (gateway, gateway_status) {
            (GatewayKind::Stripe, "incomplete") => SubscriptionStatus::PendingConfirmation,
            (GatewayKind::Stripe, "canceled" | "incomplete_expired") => SubscriptionStatus::Cancelled,
            (GatewayKind::Razorpay, "created") => SubscriptionStatus::PendingConfirmation,
            (GatewayKind::Razorpay, "cancelled" | "completed" | "expired") => {
                SubscriptionStatus::Cancelled
            }
            _ => SubscriptionStatus::Active,
        };

        if cancel_at_period_end && status == SubscriptionStatus::Active {
            SubscriptionStatus::CancelScheduled
        } else {
            status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_statuses_map_onto_lifecycle() {
        assert_eq!(
            SubscriptionStatus::from_gateway(GatewayKind::Stripe, "trialing", false),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_gateway(GatewayKind::Stripe, "incomplete", false),
            SubscriptionStatus::PendingConfirmation
        );
        assert_eq!(
            SubscriptionStatus::from_gateway(GatewayKind::Stripe, "active", true),
            SubscriptionStatus::CancelScheduled
        );
        assert_eq!(
            SubscriptionStatus::from_gateway(GatewayKind::Stripe, "canceled", true),
            SubscriptionStatus::Cancelled
        );
    }

    #[test]
    fn razorpay_statuses_map_onto_lifecycle() {
        assert_eq!(
            SubscriptionStatus::from_gateway(GatewayKind::Razorpay, "created", false),
            SubscriptionStatus::PendingConfirmation
        );
        assert_eq!(
            SubscriptionStatus::from_gateway(GatewayKind::Razorpay, "authenticated", false),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_gateway(GatewayKind::Razorpay, "cancelled", false),
            SubscriptionStatus::Cancelled
        );
    }

    #[test]
    fn display_matches_serialized_form() {
        for status in [
            SubscriptionStatus::PendingConfirmation,
            SubscriptionStatus::Active,
            SubscriptionStatus::CancelScheduled,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Disabled,
        ] {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.to_string())
            );
        }
    }
}
