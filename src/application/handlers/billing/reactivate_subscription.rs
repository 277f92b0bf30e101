//! ReactivateSubscriptionHandler - brings a cancelled or expired
//! subscription back.
//!
//! Two paths, decided by the grace window:
//! - CANCELLED and grace not elapsed: reactivate in place, no payment.
//! - EXPIRED (or CANCELLED past grace): a new payment is required; the
//!   handler creates it PENDING and tells the caller to complete checkout.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, Payment, PaymentLedger, PaymentMetadata, PaymentType, Subscription,
    SubscriptionLifecycle, SubscriptionStatus,
};
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::ports::SubscriptionRepository;

/// Command to reactivate a tenant's subscription.
#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionCommand {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

/// Outcome of a reactivation request.
#[derive(Debug, Clone)]
pub enum ReactivationResult {
    /// Reactivated in place within the grace window.
    Reactivated(Subscription),
    /// A new payment is required; complete checkout for this payment.
    PaymentRequired(Payment),
}

/// Routes reactivation through the free or paid path.
pub struct ReactivateSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    lifecycle: Arc<SubscriptionLifecycle>,
    ledger: Arc<PaymentLedger>,
    grace_days: u32,
}

impl ReactivateSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        lifecycle: Arc<SubscriptionLifecycle>,
        ledger: Arc<PaymentLedger>,
        grace_days: u32,
    ) -> Self {
        Self {
            subscriptions,
            lifecycle,
            ledger,
            grace_days,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateSubscriptionCommand,
    ) -> Result<ReactivationResult, BillingError> {
        let now = Timestamp::now();
        let subscription = self
            .subscriptions
            .find_by_tenant(&cmd.tenant_id)
            .await?
            .ok_or_else(|| BillingError::not_found("subscription", cmd.tenant_id.to_string()))?;

        match subscription.status {
            SubscriptionStatus::Cancelled if !subscription.is_past_grace(now, self.grace_days) => {
                let sub = self
                    .lifecycle
                    .reactivate_in_grace(&cmd.tenant_id, self.grace_days, now)
                    .await?;
                Ok(ReactivationResult::Reactivated(sub))
            }
            // Past grace but not yet swept, or already EXPIRED: both need a
            // fresh renewal payment that restarts the period.
            SubscriptionStatus::Cancelled | SubscriptionStatus::Expired => {
                let payment = self
                    .ledger
                    .create_payment(
                        cmd.tenant_id,
                        cmd.user_id,
                        PaymentType::MonthlySubscription,
                        PaymentMetadata::MonthlySubscription {
                            extends_period_end: None,
                        },
                        now,
                    )
                    .await?;
                Ok(ReactivationResult::PaymentRequired(payment))
            }
            SubscriptionStatus::Active => {
                Err(BillingError::invalid_state("ACTIVE", "reactivate"))
            }
            SubscriptionStatus::Trial => Err(BillingError::invalid_state("TRIAL", "reactivate")),
        }
    }
}
