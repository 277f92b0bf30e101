//! PostgreSQL adapters.
//!
//! sqlx-based implementations of the billing ports. Status and type columns
//! store the contract spellings (`ACTIVE`, `SETUP_FEE`, ...) verbatim so the
//! schema interoperates with the existing platform tables.

mod billing_store;
mod payment_repository;
mod rows;
mod subscription_repository;
mod tenant_repository;

pub use billing_store::PostgresBillingStore;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use tenant_repository::PostgresTenantRepository;
