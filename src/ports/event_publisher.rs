//! Event publisher port - the audit log sink.
//!
//! Write-only and fire-and-forget: the billing core publishes one envelope
//! per committed transition and per settlement, and a publish failure is
//! logged by the caller rather than propagated into the transition result.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing audit events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish a batch of events in order.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}
