//! Subscription aggregate entity.
//!
//! One subscription per tenant (unique constraint on the tenant reference).
//! The aggregate owns the period bookkeeping: every mutation that changes the
//! period goes through [`BillingPeriod`], so the invariants
//! `period_end == next_billing_date - 1 day` and
//! `next_billing_date == period_start + 1 month (day-clamped)` hold by
//! construction.
//!
//! Rows are never hard-deleted; EXPIRED is as final as it gets, and even that
//! is reversible through a reactivation payment.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, StateMachine, SubscriptionId, TenantId, Timestamp,
};

use super::{BillingPeriod, SubscriptionStatus};

/// Subscription aggregate - the recurring-billing record for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// Tenant this subscription bills. Unique across subscriptions.
    pub tenant_id: TenantId,

    /// Current lifecycle status.
    pub status: SubscriptionStatus,

    /// Start of the current billing period.
    pub current_period_start: Timestamp,

    /// Inclusive end of the current billing period.
    pub current_period_end: Timestamp,

    /// Date the next charge falls due. Always `current_period_end + 1 day`.
    pub next_billing_date: Timestamp,

    /// When the subscription entered CANCELLED (lapse or owner request).
    pub cancelled_at: Option<Timestamp>,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates an ACTIVE subscription with its first period starting at `now`.
    ///
    /// Called when the first setup-fee payment succeeds. There is no
    /// unpaid-pending state: a subscription row only exists once paid for.
    pub fn start(id: SubscriptionId, tenant_id: TenantId, now: Timestamp) -> Self {
        let period = BillingPeriod::starting_at(now);
        Self {
            id,
            tenant_id,
            status: SubscriptionStatus::Active,
            current_period_start: period.period_start,
            current_period_end: period.period_end,
            next_billing_date: period.next_billing_date,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a successful renewal payment.
    ///
    /// A renewal on or before the period end extends contiguously: the new
    /// period starts the day after the old one ended. A renewal landing after
    /// the period end (lapse-grace merge, or an EXPIRED reactivation payment)
    /// restarts the period from `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current status cannot transition to ACTIVE.
    pub fn renew(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;

        let start = if now <= self.current_period_end {
            self.current_period_end.add_days(1)
        } else {
            now
        };
        self.set_period(BillingPeriod::starting_at(start));
        self.cancelled_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Applies a successful setup-fee payment to an existing TRIAL or
    /// EXPIRED subscription: the status becomes ACTIVE and the period
    /// restarts from `now`, regardless of what the old period said.
    pub fn restart(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.set_period(BillingPeriod::starting_at(now));
        self.cancelled_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Lapses an unpaid subscription: ACTIVE -> CANCELLED, driven by
    /// reconciliation once the period end has passed.
    ///
    /// The period fields stay as they are; the grace clock runs off
    /// `current_period_end`.
    pub fn lapse(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Owner-requested cancellation: ACTIVE -> CANCELLED, effective at the
    /// period end.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Expires a subscription whose grace period has run out, or a TRIAL
    /// whose period has ended.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    /// Owner reactivation within the grace window: CANCELLED -> ACTIVE with
    /// no new payment. Period fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the grace window has already elapsed (the caller
    /// must route through the paid reactivation path) or if the status is not
    /// CANCELLED.
    pub fn reactivate_in_grace(
        &mut self,
        now: Timestamp,
        grace_days: u32,
    ) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Cancelled {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot reactivate a {} subscription without payment",
                    self.status.as_str()
                ),
            ));
        }
        if now > self.grace_deadline(grace_days) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Grace period has elapsed; reactivation requires a new payment",
            ));
        }
        self.transition_to(SubscriptionStatus::Active)?;
        self.cancelled_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// The instant after which a CANCELLED subscription expires.
    pub fn grace_deadline(&self, grace_days: u32) -> Timestamp {
        self.current_period_end.add_days(i64::from(grace_days))
    }

    /// True once `now` is strictly past the grace deadline.
    pub fn is_past_grace(&self, now: Timestamp, grace_days: u32) -> bool {
        now > self.grace_deadline(grace_days)
    }

    /// Whole days until the period end, floored at zero.
    pub fn days_remaining(&self, now: Timestamp) -> u32 {
        if now >= self.current_period_end {
            return 0;
        }
        self.current_period_end.duration_since(&now).num_days().max(0) as u32
    }

    fn set_period(&mut self, period: BillingPeriod) {
        self.current_period_start = period.period_start;
        self.current_period_end = period.period_end;
        self.next_billing_date = period.next_billing_date;
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {} to {}",
                    self.status.as_str(),
                    target.as_str()
                ),
            )
        })?;
        Ok(())
    }
}
