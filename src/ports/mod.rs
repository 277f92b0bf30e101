//! Ports - interfaces between the domain and infrastructure.
//!
//! Each port is an async trait implemented by one or more adapters. The
//! domain services depend only on these traits, never on concrete
//! infrastructure.

mod billing_store;
mod event_publisher;
mod payment_repository;
mod subscription_repository;
mod tenant_repository;

pub use billing_store::{BillingStore, CommitOutcome, TransitionCommit};
pub use event_publisher::EventPublisher;
pub use payment_repository::{PaymentRepository, SettleWrite};
pub use subscription_repository::SubscriptionRepository;
pub use tenant_repository::TenantRepository;
