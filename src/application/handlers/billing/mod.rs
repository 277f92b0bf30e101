//! Billing use-case handlers.

mod cancel_subscription;
mod get_subscription;
mod process_payment;
mod reactivate_subscription;
mod start_setup_payment;

pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery, SubscriptionSnapshot};
pub use process_payment::{ProcessPaymentCommand, ProcessPaymentHandler};
pub use reactivate_subscription::{
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, ReactivationResult,
};
pub use start_setup_payment::{StartSetupPaymentCommand, StartSetupPaymentHandler};
