//! ProcessPaymentHandler - synchronous mock-gateway settlement path.
//!
//! The development/test stand-in for the real gateway: instead of waiting
//! for an asynchronous callback, the caller settles the payment directly
//! with the outcome it wants. Runs through exactly the same ledger
//! settlement as the webhook path.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, PaymentLedger, PaymentOutcome, PaymentReference, Settlement,
};
use crate::domain::foundation::{PaymentId, Timestamp};

/// Command to settle a payment through the mock gateway.
#[derive(Debug, Clone)]
pub struct ProcessPaymentCommand {
    pub payment_id: PaymentId,
    pub outcome: PaymentOutcome,
}

/// Settles a payment synchronously.
pub struct ProcessPaymentHandler {
    ledger: Arc<PaymentLedger>,
}

impl ProcessPaymentHandler {
    pub fn new(ledger: Arc<PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, cmd: ProcessPaymentCommand) -> Result<Settlement, BillingError> {
        self.ledger
            .settle(
                PaymentReference::Id(cmd.payment_id),
                cmd.outcome,
                Timestamp::now(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{
        BillingPrices, PaymentMetadata, PaymentStatus, PaymentType, SubscriptionLifecycle,
        SubscriptionStatus,
    };
    use crate::domain::foundation::{TenantId, UserId};
    use crate::domain::tenancy::Tenant;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    #[tokio::test]
    async fn processing_a_setup_payment_activates_the_tenant() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant = Tenant::new(
            TenantId::new(),
            "Acme",
            "acme",
            UserId::new("owner-1").unwrap(),
            ts("2026-01-01T00:00:00Z"),
        )
        .unwrap();
        let tenant_id = tenant.id;
        store.seed_tenant(tenant);

        let lifecycle = Arc::new(SubscriptionLifecycle::new(store.clone(), bus.clone()));
        let ledger = Arc::new(PaymentLedger::new(
            store.clone(),
            lifecycle,
            BillingPrices {
                setup_fee: 10_000,
                monthly_subscription: 5_000,
            },
            bus,
        ));

        let payment = ledger
            .create_payment(
                tenant_id,
                UserId::new("owner-1").unwrap(),
                PaymentType::SetupFee,
                PaymentMetadata::SetupFee { reactivation: false },
                ts("2026-01-15T00:00:00Z"),
            )
            .await
            .unwrap();

        let handler = ProcessPaymentHandler::new(ledger);
        let settlement = handler
            .handle(ProcessPaymentCommand {
                payment_id: payment.id,
                outcome: PaymentOutcome::Success,
            })
            .await
            .unwrap();

        assert!(matches!(settlement, Settlement::Applied(_)));
        assert_eq!(settlement.payment().status, PaymentStatus::Succeeded);
        assert_eq!(
            store.subscription(&tenant_id).unwrap().status,
            SubscriptionStatus::Active
        );
        assert!(store.tenant(&tenant_id).unwrap().is_active);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let lifecycle = Arc::new(SubscriptionLifecycle::new(store.clone(), bus.clone()));
        let ledger = Arc::new(PaymentLedger::new(
            store,
            lifecycle,
            BillingPrices {
                setup_fee: 10_000,
                monthly_subscription: 5_000,
            },
            bus,
        ));

        let handler = ProcessPaymentHandler::new(ledger);
        let result = handler
            .handle(ProcessPaymentCommand {
                payment_id: PaymentId::new(),
                outcome: PaymentOutcome::Success,
            })
            .await;

        assert!(matches!(result, Err(BillingError::NotFound { .. })));
    }
}
