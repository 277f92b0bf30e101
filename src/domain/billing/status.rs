//! Subscription status state machine.
//!
//! Defines the subscription states and the transitions the lifecycle is
//! allowed to make between them. The serialized spellings are part of the
//! persisted contract and must not change.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    /// Legacy introductory state. A setup-fee payment activates it;
    /// reconciliation expires it once its period has ended.
    #[serde(rename = "TRIAL")]
    Trial,

    /// Paid up. The tenant serves traffic.
    #[serde(rename = "ACTIVE")]
    Active,

    /// Lapsed or cancelled by the owner. The tenant stays reachable until
    /// the grace period runs out.
    #[serde(rename = "CANCELLED")]
    Cancelled,

    /// Grace exhausted. The tenant is deactivated until a new payment.
    #[serde(rename = "EXPIRED")]
    Expired,
}

impl SubscriptionStatus {
    /// Contract spelling, used for persistence and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "TRIAL",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }

    /// Returns true if this status keeps the storefront reachable.
    ///
    /// Cancelled subscriptions retain access: the grace window is what
    /// separates cancellation from expiry.
    pub fn has_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trial | SubscriptionStatus::Active | SubscriptionStatus::Cancelled
        )
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From TRIAL
            (Trial, Active)
                | (Trial, Expired)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, Cancelled) // Lapse or owner cancellation
            // From CANCELLED
                | (Cancelled, Active) // Reactivation or renewal in grace
                | (Cancelled, Expired)
            // From EXPIRED
                | (Expired, Active) // Requires a fresh successful payment
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trial => vec![Active, Expired],
            Active => vec![Active, Cancelled],
            Cancelled => vec![Active, Expired],
            Expired => vec![Active],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_renew_to_active() {
        let result = SubscriptionStatus::Active.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn active_can_transition_to_cancelled() {
        assert!(SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn active_cannot_jump_straight_to_expired() {
        assert!(!SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Expired));
    }

    #[test]
    fn cancelled_can_reactivate_or_expire() {
        assert!(SubscriptionStatus::Cancelled.can_transition_to(&SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Cancelled.can_transition_to(&SubscriptionStatus::Expired));
    }

    #[test]
    fn expired_can_only_reactivate() {
        assert_eq!(
            SubscriptionStatus::Expired.valid_transitions(),
            vec![SubscriptionStatus::Active]
        );
    }

    #[test]
    fn expired_cannot_be_cancelled() {
        assert!(!SubscriptionStatus::Expired.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn trial_activates_or_expires() {
        assert!(SubscriptionStatus::Trial.can_transition_to(&SubscriptionStatus::Active));
        assert!(SubscriptionStatus::Trial.can_transition_to(&SubscriptionStatus::Expired));
        assert!(!SubscriptionStatus::Trial.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn no_status_is_terminal() {
        // Even EXPIRED can come back via a reactivation payment.
        for status in [
            SubscriptionStatus::Trial,
            SubscriptionStatus::Active,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn has_access_denied_only_for_expired() {
        assert!(SubscriptionStatus::Trial.has_access());
        assert!(SubscriptionStatus::Active.has_access());
        assert!(SubscriptionStatus::Cancelled.has_access());
        assert!(!SubscriptionStatus::Expired.has_access());
    }

    #[test]
    fn serializes_with_contract_spellings() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Trial).unwrap(),
            "\"TRIAL\""
        );
    }

    #[test]
    fn as_str_matches_serde_spelling() {
        for status in [
            SubscriptionStatus::Trial,
            SubscriptionStatus::Active,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
