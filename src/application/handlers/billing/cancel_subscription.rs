//! CancelSubscriptionHandler - owner-initiated cancellation.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription, SubscriptionLifecycle};
use crate::domain::foundation::{TenantId, Timestamp};

/// Command to cancel a tenant's subscription at period end.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub tenant_id: TenantId,
}

/// Applies the owner cancellation. The storefront stays reachable until the
/// current period ends.
pub struct CancelSubscriptionHandler {
    lifecycle: Arc<SubscriptionLifecycle>,
}

impl CancelSubscriptionHandler {
    pub fn new(lifecycle: Arc<SubscriptionLifecycle>) -> Self {
        Self { lifecycle }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<Subscription, BillingError> {
        self.lifecycle
            .cancel(&cmd.tenant_id, Timestamp::now())
            .await
    }
}
