//! Gateway callback ingestion.
//!
//! The asynchronous half of settlement: the payment provider posts a callback
//! once an order finishes, and this module turns it into exactly one ledger
//! settlement. The body is taken as raw bytes so a signature scheme can be
//! verified over the exact wire payload; verification itself is the
//! injectable [`CallbackVerifier`].
//!
//! Callback senders retry on non-2xx, so everything that is not actionable -
//! duplicates, unknown orders we cannot reconstruct - acknowledges rather
//! than errors.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::domain::foundation::{PaymentId, TenantId, Timestamp, UserId};
use crate::ports::PaymentRepository;

use super::{
    BillingError, CallbackVerifier, PaymentLedger, PaymentMetadata, PaymentOutcome,
    PaymentReference, PaymentType, Settlement,
};

/// Terminal order status reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOrderStatus {
    Completed,
    Rejected,
}

impl GatewayOrderStatus {
    fn outcome(self) -> PaymentOutcome {
        match self {
            GatewayOrderStatus::Completed => PaymentOutcome::Success,
            GatewayOrderStatus::Rejected => PaymentOutcome::Failure,
        }
    }
}

/// Parsed provider callback.
///
/// `order_id` is the provider's reference - our `transaction_id`.
/// `external_order_id` echoes the merchant order id we registered, which is
/// our payment id. The remaining fields echo merchant metadata and are only
/// needed when a callback arrives before its payment row exists.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayCallback {
    pub order_id: String,
    #[serde(default)]
    pub external_order_id: Option<String>,
    pub status: GatewayOrderStatus,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub payment_type: Option<PaymentType>,
}

/// What ingestion did with a callback. All variants map to 2xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// The callback settled a payment.
    Settled,
    /// The transaction had already been settled; nothing changed.
    AlreadyProcessed,
    /// The callback was acknowledged without effect.
    Ignored { reason: String },
}

/// Ingests provider callbacks idempotently.
pub struct WebhookIngestor {
    verifier: Arc<dyn CallbackVerifier>,
    ledger: Arc<PaymentLedger>,
    payments: Arc<dyn PaymentRepository>,
}

impl WebhookIngestor {
    pub fn new(
        verifier: Arc<dyn CallbackVerifier>,
        ledger: Arc<PaymentLedger>,
        payments: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            payments,
        }
    }

    /// Processes one raw callback delivery.
    ///
    /// # Errors
    ///
    /// - `InvalidCallbackSignature` when the verifier rejects the payload
    /// - `Gateway` when the body is not a parseable callback
    /// - lifecycle/storage errors from the settlement itself
    pub async fn ingest(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: Timestamp,
    ) -> Result<CallbackDisposition, BillingError> {
        self.verifier.verify(payload, signature)?;

        let callback: GatewayCallback = serde_json::from_slice(payload)
            .map_err(|e| BillingError::gateway(format!("Unparseable callback body: {}", e)))?;

        let outcome = callback.status.outcome();
        let reference = self.locate(&callback, now).await?;

        let reference = match reference {
            Some(r) => r,
            None => {
                tracing::warn!(
                    order_id = %callback.order_id,
                    "Callback references an unknown order and carries no echo fields; acknowledging"
                );
                return Ok(CallbackDisposition::Ignored {
                    reason: "unknown order reference".to_string(),
                });
            }
        };

        match self.ledger.settle(reference, outcome, now).await? {
            Settlement::Applied(payment) => {
                tracing::info!(
                    payment_id = %payment.id,
                    transaction_id = %payment.transaction_id,
                    status = payment.status.as_str(),
                    "Callback settled payment"
                );
                Ok(CallbackDisposition::Settled)
            }
            Settlement::AlreadySettled(payment) => {
                tracing::info!(
                    payment_id = %payment.id,
                    transaction_id = %payment.transaction_id,
                    "Duplicate callback delivery; already settled"
                );
                Ok(CallbackDisposition::AlreadyProcessed)
            }
        }
    }

    /// Finds the payment a callback refers to, creating it defensively when
    /// the delivery beat the checkout write and the echo fields allow it.
    async fn locate(
        &self,
        callback: &GatewayCallback,
        now: Timestamp,
    ) -> Result<Option<PaymentReference>, BillingError> {
        if self
            .payments
            .find_by_transaction_id(&callback.order_id)
            .await?
            .is_some()
        {
            return Ok(Some(PaymentReference::Transaction(
                callback.order_id.clone(),
            )));
        }

        if let Some(external) = &callback.external_order_id {
            if let Ok(payment_id) = PaymentId::from_str(external) {
                if self.payments.find_by_id(&payment_id).await?.is_some() {
                    return Ok(Some(PaymentReference::Id(payment_id)));
                }
            }
        }

        // Out-of-order delivery: no row yet. Reconstruct from the echoed
        // merchant metadata when present.
        let (Some(tenant_id), Some(user_id), Some(payment_type)) =
            (callback.tenant_id, &callback.user_id, callback.payment_type)
        else {
            return Ok(None);
        };

        let user_id = UserId::new(user_id.clone())
            .map_err(|e| BillingError::gateway(format!("Callback user_id: {}", e)))?;
        let metadata = match payment_type {
            PaymentType::SetupFee => PaymentMetadata::SetupFee { reactivation: false },
            PaymentType::MonthlySubscription => PaymentMetadata::MonthlySubscription {
                extends_period_end: None,
            },
        };

        tracing::warn!(
            order_id = %callback.order_id,
            tenant_id = %tenant_id,
            payment_type = payment_type.as_str(),
            "Callback arrived before its payment; creating ledger entry defensively"
        );
        let payment = self
            .ledger
            .create_payment_for_callback(
                tenant_id,
                user_id,
                payment_type,
                metadata,
                callback.order_id.clone(),
                now,
            )
            .await?;
        Ok(Some(PaymentReference::Id(payment.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{
        BillingPrices, NoopVerifier, PaymentStatus, SubscriptionLifecycle, SubscriptionStatus,
    };
    use crate::domain::tenancy::Tenant;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        ledger: Arc<PaymentLedger>,
        ingestor: WebhookIngestor,
        tenant_id: TenantId,
    }

    fn fixture() -> Fixture {
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
                setup_fee: 5000,
                monthly_subscription: 2900,
            },
            bus,
        ));
        let ingestor = WebhookIngestor::new(Arc::new(NoopVerifier), ledger.clone(), store.clone());
        Fixture {
            store,
            ledger,
            ingestor,
            tenant_id,
        }
    }

    fn owner() -> UserId {
        UserId::new("owner-1").unwrap()
    }

    async fn pending_setup_payment(f: &Fixture) -> crate::domain::billing::Payment {
        f.ledger
            .create_payment(
                f.tenant_id,
                owner(),
                PaymentType::SetupFee,
                PaymentMetadata::SetupFee { reactivation: false },
                ts("2026-01-15T00:00:00Z"),
            )
            .await
            .unwrap()
    }

    fn completed_body(order_id: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "order_id": order_id,
            "status": "completed",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn completed_callback_settles_and_activates() {
        let f = fixture();
        let payment = pending_setup_payment(&f).await;

        let disposition = f
            .ingestor
            .ingest(
                &completed_body(&payment.transaction_id),
                None,
                ts("2026-01-15T00:01:00Z"),
            )
            .await
            .unwrap();

        assert_eq!(disposition, CallbackDisposition::Settled);
        assert_eq!(
            f.store.payment(&payment.id).unwrap().status,
            PaymentStatus::Succeeded
        );
        assert_eq!(
            f.store.subscription(&f.tenant_id).unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn duplicate_delivery_acknowledges_without_second_effect() {
        let f = fixture();
        let payment = pending_setup_payment(&f).await;
        let body = completed_body(&payment.transaction_id);

        let first = f
            .ingestor
            .ingest(&body, None, ts("2026-01-15T00:01:00Z"))
            .await
            .unwrap();
        let sub_after_first = f.store.subscription(&f.tenant_id).unwrap();

        let second = f
            .ingestor
            .ingest(&body, None, ts("2026-01-15T00:02:00Z"))
            .await
            .unwrap();

        assert_eq!(first, CallbackDisposition::Settled);
        assert_eq!(second, CallbackDisposition::AlreadyProcessed);
        // Exactly one subscription, period untouched by the redelivery.
        assert_eq!(f.store.subscription(&f.tenant_id).unwrap(), sub_after_first);
        assert_eq!(f.store.payments().len(), 1);
    }

    #[tokio::test]
    async fn rejected_callback_fails_payment_without_subscription_change() {
        let f = fixture();
        let payment = pending_setup_payment(&f).await;

        let body = serde_json::to_vec(&serde_json::json!({
            "order_id": payment.transaction_id,
            "status": "rejected",
        }))
        .unwrap();

        let disposition = f
            .ingestor
            .ingest(&body, None, ts("2026-01-15T00:01:00Z"))
            .await
            .unwrap();

        assert_eq!(disposition, CallbackDisposition::Settled);
        assert_eq!(
            f.store.payment(&payment.id).unwrap().status,
            PaymentStatus::Failed
        );
        assert!(f.store.subscription(&f.tenant_id).is_none());
    }

    #[tokio::test]
    async fn out_of_order_callback_creates_payment_defensively() {
        let f = fixture();

        let body = serde_json::to_vec(&serde_json::json!({
            "order_id": "ord_gateway_first",
            "status": "completed",
            "tenant_id": f.tenant_id,
            "user_id": "owner-1",
            "payment_type": "SETUP_FEE",
        }))
        .unwrap();

        let disposition = f
            .ingestor
            .ingest(&body, None, ts("2026-01-15T00:01:00Z"))
            .await
            .unwrap();

        assert_eq!(disposition, CallbackDisposition::Settled);
        let payments = f.store.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].transaction_id, "ord_gateway_first");
        assert_eq!(payments[0].status, PaymentStatus::Succeeded);
        assert_eq!(
            f.store.subscription(&f.tenant_id).unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn unknown_order_without_echo_fields_is_acknowledged() {
        let f = fixture();

        let disposition = f
            .ingestor
            .ingest(
                &completed_body("ord_total_mystery"),
                None,
                ts("2026-01-15T00:01:00Z"),
            )
            .await
            .unwrap();

        assert!(matches!(disposition, CallbackDisposition::Ignored { .. }));
        assert!(f.store.payments().is_empty());
    }

    #[tokio::test]
    async fn unparseable_body_is_a_gateway_error() {
        let f = fixture();
        let result = f
            .ingestor
            .ingest(b"not json at all", None, ts("2026-01-15T00:01:00Z"))
            .await;
        assert!(matches!(result, Err(BillingError::Gateway(_))));
    }

    #[tokio::test]
    async fn failing_verifier_blocks_ingestion() {
        let f = fixture();
        struct RejectAll;
        impl CallbackVerifier for RejectAll {
            fn verify(&self, _: &[u8], _: Option<&str>) -> Result<(), BillingError> {
                Err(BillingError::invalid_callback_signature())
            }
        }
        let ingestor =
            WebhookIngestor::new(Arc::new(RejectAll), f.ledger.clone(), f.store.clone());

        let result = ingestor
            .ingest(&completed_body("ord_x"), Some("bad"), ts("2026-01-15T00:01:00Z"))
            .await;

        assert_eq!(result, Err(BillingError::invalid_callback_signature()));
    }
}
