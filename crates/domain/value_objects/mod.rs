pub mod enums;
pub mod numeric;
pub mod plans;
pub mod subscriptions;
pub mod validation;
