use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Stripe,
    Razorpay,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Stripe => "stripe",
            GatewayKind::Razorpay => "razorpay",
        }
    }

    /// Gateway names are accepted case-insensitively.
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stripe" => Some(GatewayKind::Stripe),
            "razorpay" => Some(GatewayKind::Razorpay),
            _ => None,
        }
    }

    /// Status string the gateway reports once a subscription is cancelled.
    pub fn cancelled_status(&self) -> &'static str {
        match self {
            GatewayKind::Stripe => "canceled",
            GatewayKind::Razorpay => "cancelled",
        }
    }
}

impl Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
