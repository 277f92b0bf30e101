//! Per-request tenant access decisions.
//!
//! Pure policy logic: given the resolved tenant, its subscription (if any),
//! and the route class, decide whether the request may proceed. The gate
//! never mutates tenant or subscription state; it only reads and annotates.

use serde::Serialize;

use crate::domain::billing::{Subscription, SubscriptionStatus};
use crate::domain::foundation::Timestamp;

use super::Tenant;

/// Route classification for access purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Owner-facing admin surface. Reachable even for inactive tenants so
    /// the owner can get to the billing UI and pay.
    Admin,
    /// Public storefront. Requires an active tenant.
    Storefront,
}

/// Advisory attached to requests served during the grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraceWarning {
    /// Subscription is cancelled; this many days remain in the paid period.
    DaysRemaining { days: u32 },
    /// Subscription is cancelled and the period end has already passed
    /// (legacy tenants still flagged active).
    PastPeriodEnd,
}

/// Why a request was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedReason {
    /// Tenant exists but its storefront is switched off.
    StoreInactive,
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Request may proceed, possibly with an advisory warning.
    Granted { warning: Option<GraceWarning> },
    /// Request is blocked.
    Blocked(BlockedReason),
}

/// Read-only access gate over tenant + subscription state.
pub struct TenantAccessGate;

impl TenantAccessGate {
    /// Decides whether the request may proceed.
    ///
    /// Admin routes are always granted once the tenant resolved; storefront
    /// routes require `is_active`. Missing subscriptions are tolerated on
    /// both (legacy tenants). A CANCELLED subscription never blocks by
    /// itself; it attaches a grace warning for the owner-facing UI.
    pub fn decide(
        policy: AccessPolicy,
        tenant: &Tenant,
        subscription: Option<&Subscription>,
        now: Timestamp,
    ) -> AccessDecision {
        let warning = subscription.and_then(|sub| Self::grace_warning(sub, now));

        match policy {
            AccessPolicy::Admin => AccessDecision::Granted { warning },
            AccessPolicy::Storefront => {
                if !tenant.is_active {
                    return AccessDecision::Blocked(BlockedReason::StoreInactive);
                }
                AccessDecision::Granted { warning }
            }
        }
    }

    fn grace_warning(subscription: &Subscription, now: Timestamp) -> Option<GraceWarning> {
        if subscription.status != SubscriptionStatus::Cancelled {
            return None;
        }
        if now > subscription.current_period_end {
            Some(GraceWarning::PastPeriodEnd)
        } else {
            Some(GraceWarning::DaysRemaining {
                days: subscription.days_remaining(now),
            })
        }
    }
}
