//! StartSetupPaymentHandler - begins the setup-fee checkout for a tenant.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, Payment, PaymentLedger, PaymentMetadata, PaymentType, SubscriptionStatus,
};
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::ports::SubscriptionRepository;

/// Command to start a setup-fee payment.
#[derive(Debug, Clone)]
pub struct StartSetupPaymentCommand {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

/// Creates the PENDING setup-fee payment a new (or expired) tenant pays to
/// activate its subscription.
pub struct StartSetupPaymentHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    ledger: Arc<PaymentLedger>,
}

impl StartSetupPaymentHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, ledger: Arc<PaymentLedger>) -> Self {
        Self {
            subscriptions,
            ledger,
        }
    }

    pub async fn handle(&self, cmd: StartSetupPaymentCommand) -> Result<Payment, BillingError> {
        let existing = self.subscriptions.find_by_tenant(&cmd.tenant_id).await?;

        let metadata = match existing.as_ref().map(|s| s.status) {
            None | Some(SubscriptionStatus::Trial) => {
                PaymentMetadata::SetupFee { reactivation: false }
            }
            Some(SubscriptionStatus::Expired) => PaymentMetadata::SetupFee { reactivation: true },
            Some(SubscriptionStatus::Active) => {
                return Err(BillingError::invalid_state("ACTIVE", "start a setup payment"));
            }
            Some(SubscriptionStatus::Cancelled) => {
                return Err(BillingError::invalid_state(
                    "CANCELLED",
                    "start a setup payment; use reactivation",
                ));
            }
        };

        self.ledger
            .create_payment(
                cmd.tenant_id,
                cmd.user_id,
                PaymentType::SetupFee,
                metadata,
                Timestamp::now(),
            )
            .await
    }
}
