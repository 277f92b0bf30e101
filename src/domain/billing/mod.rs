//! Billing bounded context.
//!
//! The billing core of the platform: billing-period arithmetic, the payment
//! ledger, the subscription lifecycle state machine, and the ingestion of
//! payment-gateway callbacks.

mod errors;
mod events;
mod ingest;
mod ledger;
mod lifecycle;
mod payment;
mod period;
mod status;
mod subscription;
mod webhook_verifier;

pub use errors::BillingError;
pub use events::BillingEvent;
pub use ingest::{CallbackDisposition, GatewayCallback, GatewayOrderStatus, WebhookIngestor};
pub use ledger::{BillingPrices, PaymentLedger, PaymentReference, Settlement};
pub use lifecycle::SubscriptionLifecycle;
pub use payment::{Payment, PaymentMetadata, PaymentOutcome, PaymentStatus, PaymentType};
pub use period::{add_safe_months, BillingPeriod};
pub use status::SubscriptionStatus;
pub use subscription::Subscription;
pub use webhook_verifier::{CallbackVerifier, HmacCallbackVerifier, NoopVerifier};
