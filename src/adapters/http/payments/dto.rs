//! Request/response DTOs for the payment endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::SubscriptionSnapshot;
use crate::domain::billing::{Payment, PaymentOutcome, Subscription};
use crate::domain::foundation::Timestamp;
use crate::domain::tenancy::GraceWarning;

/// Subscription as rendered to the owner UI.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub status: String,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub next_billing_date: Timestamp,
    pub cancelled_at: Option<Timestamp>,
    pub days_remaining: u32,
    pub grace_deadline: Option<Timestamp>,
}

impl SubscriptionResponse {
    /// Renders a bare subscription (no grace bookkeeping attached).
    pub fn from_subscription(subscription: &Subscription) -> Self {
        Self {
            id: subscription.id.to_string(),
            status: subscription.status.as_str().to_string(),
            current_period_start: subscription.current_period_start,
            current_period_end: subscription.current_period_end,
            next_billing_date: subscription.next_billing_date,
            cancelled_at: subscription.cancelled_at,
            days_remaining: subscription.days_remaining(Timestamp::now()),
            grace_deadline: None,
        }
    }
}

impl From<SubscriptionSnapshot> for SubscriptionResponse {
    fn from(snapshot: SubscriptionSnapshot) -> Self {
        let mut response = Self::from_subscription(&snapshot.subscription);
        response.days_remaining = snapshot.days_remaining;
        response.grace_deadline = snapshot.grace_deadline;
        response
    }
}

/// Snapshot endpoint response.
#[derive(Debug, Clone, Serialize)]
pub struct GetSubscriptionResponse {
    pub subscription: Option<SubscriptionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<GraceWarning>,
}

/// Payment as rendered to callers.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub payment_type: String,
    pub amount: i64,
    pub status: String,
    pub transaction_id: String,
    pub created_at: Timestamp,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            payment_type: payment.payment_type.as_str().to_string(),
            amount: payment.amount,
            status: payment.status.as_str().to_string(),
            transaction_id: payment.transaction_id.clone(),
            created_at: payment.created_at,
        }
    }
}

/// Mock-gateway settlement request.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPaymentRequest {
    pub outcome: PaymentOutcome,
}

/// Mock-gateway settlement response.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessPaymentResponse {
    pub payment: PaymentResponse,
    /// True when this request was a duplicate of an earlier settlement.
    pub already_settled: bool,
}

/// Reactivation response, tagged by which path applied.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReactivateResponse {
    Reactivated { subscription: SubscriptionResponse },
    PaymentRequired { payment: PaymentResponse },
}

/// Callback acknowledgement. The provider only checks the status code, but
/// an explicit body helps manual debugging.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackAck {
    pub received: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionId, TenantId};

    #[test]
    fn subscription_response_uses_contract_status_spelling() {
        let mut sub = Subscription::start(
            SubscriptionId::new(),
            TenantId::new(),
            Timestamp::parse_rfc3339("2026-01-15T00:00:00Z").unwrap(),
        );
        sub.cancel(Timestamp::parse_rfc3339("2026-01-20T00:00:00Z").unwrap())
            .unwrap();

        let response = SubscriptionResponse::from_subscription(&sub);
        assert_eq!(response.status, "CANCELLED");
        assert!(response.cancelled_at.is_some());
    }

    #[test]
    fn process_request_parses_outcomes() {
        let req: ProcessPaymentRequest =
            serde_json::from_str(r#"{"outcome":"success"}"#).unwrap();
        assert_eq!(req.outcome, PaymentOutcome::Success);

        let req: ProcessPaymentRequest =
            serde_json::from_str(r#"{"outcome":"failure"}"#).unwrap();
        assert_eq!(req.outcome, PaymentOutcome::Failure);
    }

    #[test]
    fn reactivate_response_is_tagged() {
        let sub = Subscription::start(
            SubscriptionId::new(),
            TenantId::new(),
            Timestamp::parse_rfc3339("2026-01-15T00:00:00Z").unwrap(),
        );
        let response = ReactivateResponse::Reactivated {
            subscription: SubscriptionResponse::from_subscription(&sub),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["result"], "reactivated");
    }
}
