//! Domain event envelope for the audit log sink.
//!
//! The billing core emits one event per committed lifecycle transition.
//! Events are carried in a flat envelope: a typed header plus a JSON payload.
//! The audit sink is write-only and fire-and-forget, so there is no replay,
//! versioning, or upcasting machinery here.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Unique identifier for a domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random EventId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialized domain event ready for the audit sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event identifier.
    pub event_id: EventId,

    /// Dotted event type name, e.g. `subscription.lapsed`.
    pub event_type: String,

    /// Identifier of the aggregate the event belongs to.
    pub aggregate_id: String,

    /// Aggregate type name, e.g. `Subscription`.
    pub aggregate_type: String,

    /// When the event occurred.
    pub occurred_at: Timestamp,

    /// Event-specific payload.
    pub payload: serde_json::Value,
}
