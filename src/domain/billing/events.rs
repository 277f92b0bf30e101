//! Billing domain events.
//!
//! One event per committed lifecycle transition plus one per payment
//! settlement, written to the audit sink. The sink is fire-and-forget; these
//! events drive nothing inside the billing core itself.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    EventEnvelope, EventId, PaymentId, SubscriptionId, TenantId, Timestamp,
};

use super::{PaymentStatus, PaymentType};

/// Events emitted by the billing core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BillingEvent {
    /// First successful setup-fee payment created and activated the
    /// subscription.
    SubscriptionActivated {
        event_id: EventId,
        subscription_id: SubscriptionId,
        tenant_id: TenantId,
        period_start: Timestamp,
        period_end: Timestamp,
        occurred_at: Timestamp,
    },

    /// Successful renewal payment extended (or restarted) the period.
    SubscriptionRenewed {
        event_id: EventId,
        subscription_id: SubscriptionId,
        tenant_id: TenantId,
        new_period_start: Timestamp,
        new_period_end: Timestamp,
        occurred_at: Timestamp,
    },

    /// Reconciliation found the period ended with no renewal.
    SubscriptionLapsed {
        event_id: EventId,
        subscription_id: SubscriptionId,
        tenant_id: TenantId,
        period_end: Timestamp,
        occurred_at: Timestamp,
    },

    /// The owner requested cancellation.
    SubscriptionCancelled {
        event_id: EventId,
        subscription_id: SubscriptionId,
        tenant_id: TenantId,
        effective_at: Timestamp,
        occurred_at: Timestamp,
    },

    /// Grace period ran out; the tenant was deactivated.
    SubscriptionExpired {
        event_id: EventId,
        subscription_id: SubscriptionId,
        tenant_id: TenantId,
        occurred_at: Timestamp,
    },

    /// The owner reactivated within the grace window, no payment involved.
    SubscriptionReactivated {
        event_id: EventId,
        subscription_id: SubscriptionId,
        tenant_id: TenantId,
        occurred_at: Timestamp,
    },

    /// A payment reached a terminal status.
    PaymentSettled {
        event_id: EventId,
        payment_id: PaymentId,
        tenant_id: TenantId,
        payment_type: PaymentType,
        status: PaymentStatus,
        transaction_id: String,
        occurred_at: Timestamp,
    },
}

impl BillingEvent {
    /// Dotted event type name for the envelope.
    pub fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::SubscriptionActivated { .. } => "subscription.activated",
            BillingEvent::SubscriptionRenewed { .. } => "subscription.renewed",
            BillingEvent::SubscriptionLapsed { .. } => "subscription.lapsed",
            BillingEvent::SubscriptionCancelled { .. } => "subscription.cancelled",
            BillingEvent::SubscriptionExpired { .. } => "subscription.expired",
            BillingEvent::SubscriptionReactivated { .. } => "subscription.reactivated",
            BillingEvent::PaymentSettled { .. } => "payment.settled",
        }
    }

    fn event_id(&self) -> EventId {
        match self {
            BillingEvent::SubscriptionActivated { event_id, .. }
            | BillingEvent::SubscriptionRenewed { event_id, .. }
            | BillingEvent::SubscriptionLapsed { event_id, .. }
            | BillingEvent::SubscriptionCancelled { event_id, .. }
            | BillingEvent::SubscriptionExpired { event_id, .. }
            | BillingEvent::SubscriptionReactivated { event_id, .. }
            | BillingEvent::PaymentSettled { event_id, .. } => *event_id,
        }
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            BillingEvent::SubscriptionActivated { occurred_at, .. }
            | BillingEvent::SubscriptionRenewed { occurred_at, .. }
            | BillingEvent::SubscriptionLapsed { occurred_at, .. }
            | BillingEvent::SubscriptionCancelled { occurred_at, .. }
            | BillingEvent::SubscriptionExpired { occurred_at, .. }
            | BillingEvent::SubscriptionReactivated { occurred_at, .. }
            | BillingEvent::PaymentSettled { occurred_at, .. } => *occurred_at,
        }
    }

    fn aggregate(&self) -> (String, &'static str) {
        match self {
            BillingEvent::SubscriptionActivated { subscription_id, .. }
            | BillingEvent::SubscriptionRenewed { subscription_id, .. }
            | BillingEvent::SubscriptionLapsed { subscription_id, .. }
            | BillingEvent::SubscriptionCancelled { subscription_id, .. }
            | BillingEvent::SubscriptionExpired { subscription_id, .. }
            | BillingEvent::SubscriptionReactivated { subscription_id, .. } => {
                (subscription_id.to_string(), "Subscription")
            }
            BillingEvent::PaymentSettled { payment_id, .. } => {
                (payment_id.to_string(), "Payment")
            }
        }
    }

    /// Wraps this event into an audit-sink envelope.
    pub fn to_envelope(&self) -> EventEnvelope {
        let (aggregate_id, aggregate_type) = self.aggregate();
        EventEnvelope {
            event_id: self.event_id(),
            event_type: self.event_type().to_string(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            occurred_at: self.occurred_at(),
            payload: serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
        }
    }
}
