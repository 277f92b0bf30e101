//! Audit log sink backed by structured tracing records.
//!
//! The platform's ops stack collects structured logs; one record per billing
//! event is the audit trail. Publishing never fails, which matches the
//! fire-and-forget contract of the port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

/// Writes every published event as a structured `info` record under the
/// `audit` target.
#[derive(Default)]
pub struct TracingAuditLog;

impl TracingAuditLog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingAuditLog {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        tracing::info!(
            target: "audit",
            event_id = %event.event_id,
            event_type = %event.event_type,
            aggregate_type = %event.aggregate_type,
            aggregate_id = %event.aggregate_id,
            payload = %event.payload,
            "billing event"
        );
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventId, Timestamp};
    use serde_json::json;

    #[tokio::test]
    async fn publish_never_fails() {
        let sink = TracingAuditLog::new();
        let event = EventEnvelope {
            event_id: EventId::new(),
            event_type: "payment.settled".to_string(),
            aggregate_id: "p-1".to_string(),
            aggregate_type: "Payment".to_string(),
            occurred_at: Timestamp::now(),
            payload: json!({"status": "SUCCEEDED"}),
        };
        assert!(sink.publish(event).await.is_ok());
    }
}
