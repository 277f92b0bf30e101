//! Billing store port - atomic lifecycle commits.
//!
//! Every subscription transition writes the subscription row and the tenant
//! activation flag together; payment-driven transitions additionally settle
//! the payment in the same transaction. No caller ever observes one write
//! without the others - a crash between "payment marked succeeded" and
//! "tenant activated" is not a reachable state.

use async_trait::async_trait;

use crate::domain::billing::{Payment, Subscription};
use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::tenancy::Tenant;

/// One atomic lifecycle commit.
#[derive(Debug)]
pub struct TransitionCommit<'a> {
    /// Tenant with the post-transition activation flag.
    pub tenant: &'a Tenant,

    /// Subscription with the post-transition state. Inserted if the tenant
    /// has no subscription row yet, updated otherwise.
    pub subscription: &'a Subscription,

    /// Payment with its terminal status, when the transition was
    /// payment-driven. Written with an only-if-PENDING guard.
    pub payment: Option<&'a Payment>,
}

/// Result of an atomic commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All writes applied.
    Applied,
    /// The payment guard failed: a concurrent settlement won the race. The
    /// whole commit was rolled back.
    PaymentAlreadySettled,
}

/// Port for atomic tenant + subscription (+ payment) commits.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Load a tenant for a transition.
    async fn load_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError>;

    /// Load a tenant's subscription for a transition.
    async fn load_subscription(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Commit a transition atomically.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if inserting a second subscription for a tenant
    /// - `TenantNotFound` if the tenant row vanished mid-transition
    /// - `DatabaseError` on any other persistence failure; the transaction
    ///   is rolled back completely
    async fn commit_transition(
        &self,
        commit: TransitionCommit<'_>,
    ) -> Result<CommitOutcome, DomainError>;
}
