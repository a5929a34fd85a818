pub mod plans;
pub mod stripe_webhook;
pub mod subscriptions;
