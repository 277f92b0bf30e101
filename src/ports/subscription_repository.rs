//! Subscription repository port (read side).
//!
//! Lookup queries for subscriptions, including the two sweep predicates the
//! reconciliation job runs on every tick. All writes to subscriptions go
//! through [`crate::ports::BillingStore`] so the tenant flag and the
//! subscription row always commit together.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, TenantId, Timestamp};

/// Repository port for Subscription lookups.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find the subscription for a tenant.
    ///
    /// Returns `None` if the tenant has no subscription (at most one exists).
    async fn find_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Lapse sweep: ACTIVE subscriptions whose `current_period_end` is
    /// strictly before `cutoff`.
    async fn find_active_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Expiry sweep: CANCELLED subscriptions whose `current_period_end` is
    /// strictly before `cutoff` (callers pass `now - grace`).
    async fn find_cancelled_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Trial sweep: TRIAL subscriptions whose `current_period_end` is
    /// strictly before `cutoff`.
    async fn find_trials_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError>;
}
