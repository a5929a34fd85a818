pub mod cancel_modes;
pub mod gateways;
pub mod subscription_statuses;
