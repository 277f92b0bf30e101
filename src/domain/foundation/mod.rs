//! Foundation module - shared kernel for all bounded contexts.
//!
//! Contains the value objects, identifiers, error types, and traits that the
//! billing and tenancy contexts build on.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{EventEnvelope, EventId};
pub use ids::{PaymentId, SubscriptionId, TenantId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
