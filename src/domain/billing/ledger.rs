//! Payment ledger service.
//!
//! Creates payment attempts and settles them exactly once. Amounts come from
//! the configured price table keyed by payment type - the caller never
//! supplies a price, so a tampered checkout request cannot change what a
//! tenant is charged.
//!
//! Settlement is idempotent: a payment already in a terminal state is
//! returned as-is instead of erroring, because gateway callbacks are
//! redelivered and the sender retries on non-2xx responses.

use std::sync::Arc;

use crate::domain::foundation::{EventId, PaymentId, TenantId, Timestamp, UserId};
use crate::ports::{EventPublisher, PaymentRepository};

use super::{
    BillingError, BillingEvent, Payment, PaymentMetadata, PaymentOutcome, PaymentType,
    SubscriptionLifecycle,
};

/// Fixed price table, loaded from configuration.
#[derive(Debug, Clone, Copy)]
pub struct BillingPrices {
    /// One-time setup fee, minor currency units.
    pub setup_fee: i64,

    /// Monthly subscription fee, minor currency units.
    pub monthly_subscription: i64,
}

impl BillingPrices {
    /// Amount charged for the given payment type.
    pub fn amount_for(&self, payment_type: PaymentType) -> i64 {
        match payment_type {
            PaymentType::SetupFee => self.setup_fee,
            PaymentType::MonthlySubscription => self.monthly_subscription,
        }
    }
}

/// How a settlement caller identifies the payment.
#[derive(Debug, Clone)]
pub enum PaymentReference {
    /// Our ledger entry ID (synchronous mock-gateway path).
    Id(PaymentId),
    /// The provider transaction reference (callback path).
    Transaction(String),
}

impl std::fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentReference::Id(id) => write!(f, "{}", id),
            PaymentReference::Transaction(txn) => write!(f, "{}", txn),
        }
    }
}

/// Result of a settlement request.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// This call settled the payment.
    Applied(Payment),
    /// The payment was already terminal; the stored record is returned
    /// unchanged.
    AlreadySettled(Payment),
}

impl Settlement {
    /// The payment record, whichever way the settlement went.
    pub fn payment(&self) -> &Payment {
        match self {
            Settlement::Applied(p) | Settlement::AlreadySettled(p) => p,
        }
    }
}

/// Creates and settles payment ledger entries.
pub struct PaymentLedger {
    payments: Arc<dyn PaymentRepository>,
    lifecycle: Arc<SubscriptionLifecycle>,
    prices: BillingPrices,
    audit: Arc<dyn EventPublisher>,
}

impl PaymentLedger {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        lifecycle: Arc<SubscriptionLifecycle>,
        prices: BillingPrices,
        audit: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            payments,
            lifecycle,
            prices,
            audit,
        }
    }

    /// Inserts a PENDING payment with the configured amount and a fresh
    /// provider order reference.
    pub async fn create_payment(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        payment_type: PaymentType,
        metadata: PaymentMetadata,
        now: Timestamp,
    ) -> Result<Payment, BillingError> {
        let payment = Payment::create(
            PaymentId::new(),
            tenant_id,
            user_id,
            payment_type,
            self.prices.amount_for(payment_type),
            new_order_reference(),
            metadata,
            now,
        )?;
        self.payments.insert(&payment).await?;
        Ok(payment)
    }

    /// Inserts a payment for a callback whose transaction reference we have
    /// never seen - out-of-order delivery. Exceptional; callers log it.
    pub async fn create_payment_for_callback(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        payment_type: PaymentType,
        metadata: PaymentMetadata,
        transaction_id: String,
        now: Timestamp,
    ) -> Result<Payment, BillingError> {
        let payment = Payment::create(
            PaymentId::new(),
            tenant_id,
            user_id,
            payment_type,
            self.prices.amount_for(payment_type),
            transaction_id,
            metadata,
            now,
        )?;
        self.payments.insert(&payment).await?;
        Ok(payment)
    }

    /// Settles a PENDING payment to its terminal status.
    ///
    /// On success the matching lifecycle transition (activate for SETUP_FEE,
    /// renew for MONTHLY_SUBSCRIPTION) commits in the same storage
    /// transaction as the payment update. On failure only the payment row
    /// changes.
    ///
    /// Idempotent: an already-terminal payment - whether observed up front
    /// or lost to a concurrent settlement race - comes back as
    /// [`Settlement::AlreadySettled`].
    pub async fn settle(
        &self,
        reference: PaymentReference,
        outcome: PaymentOutcome,
        now: Timestamp,
    ) -> Result<Settlement, BillingError> {
        let stored = self.resolve(&reference).await?;

        if stored.is_terminal() {
            return Ok(Settlement::AlreadySettled(stored));
        }

        let mut payment = stored;
        payment.settle(outcome, now)?;

        match outcome {
            PaymentOutcome::Failure => {
                use crate::ports::SettleWrite;
                match self.payments.settle(&payment).await? {
                    SettleWrite::Applied => {}
                    SettleWrite::AlreadySettled => {
                        return Ok(Settlement::AlreadySettled(self.resolve(&reference).await?));
                    }
                }
            }
            PaymentOutcome::Success => {
                let result = match payment.payment_type {
                    PaymentType::SetupFee => {
                        self.lifecycle
                            .activate(&payment.tenant_id, Some(&payment), now)
                            .await
                    }
                    PaymentType::MonthlySubscription => {
                        self.lifecycle
                            .renew(&payment.tenant_id, Some(&payment), now)
                            .await
                    }
                };
                match result {
                    Ok(_) => {}
                    Err(BillingError::Conflict(_)) => {
                        // Lost the only-if-PENDING race to a concurrent
                        // delivery; the stored row carries the real outcome.
                        return Ok(Settlement::AlreadySettled(self.resolve(&reference).await?));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.publish_settled(&payment, now).await;
        Ok(Settlement::Applied(payment))
    }

    async fn resolve(&self, reference: &PaymentReference) -> Result<Payment, BillingError> {
        let found = match reference {
            PaymentReference::Id(id) => self.payments.find_by_id(id).await?,
            PaymentReference::Transaction(txn) => {
                self.payments.find_by_transaction_id(txn).await?
            }
        };
        found.ok_or_else(|| BillingError::not_found("payment", reference.to_string()))
    }

    async fn publish_settled(&self, payment: &Payment, now: Timestamp) {
        let event = BillingEvent::PaymentSettled {
            event_id: EventId::new(),
            payment_id: payment.id,
            tenant_id: payment.tenant_id,
            payment_type: payment.payment_type,
            status: payment.status,
            transaction_id: payment.transaction_id.clone(),
            occurred_at: now,
        };
        if let Err(e) = self.audit.publish(event.to_envelope()).await {
            tracing::warn!(error = %e, payment_id = %payment.id, "Failed to publish settlement event");
        }
    }
}

fn new_order_reference() -> String {
    format!("ord_{}", uuid::Uuid::new_v4().simple())
}
