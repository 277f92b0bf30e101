//! GetSubscriptionHandler - subscription snapshot for the owner UI.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription, SubscriptionStatus};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::SubscriptionRepository;

/// Query for the current subscription of a tenant.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub tenant_id: TenantId,
}

/// Subscription state plus the derived fields the owner UI renders.
#[derive(Debug, Clone)]
pub struct SubscriptionSnapshot {
    pub subscription: Subscription,
    pub days_remaining: u32,
    /// Set while the subscription is CANCELLED and reactivation without a
    /// new payment is still possible.
    pub grace_deadline: Option<Timestamp>,
}

/// Reads the subscription snapshot.
pub struct GetSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    grace_days: u32,
}

impl GetSubscriptionHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, grace_days: u32) -> Self {
        Self {
            subscriptions,
            grace_days,
        }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<Option<SubscriptionSnapshot>, BillingError> {
        let Some(subscription) = self.subscriptions.find_by_tenant(&query.tenant_id).await? else {
            return Ok(None);
        };

        let now = Timestamp::now();
        let grace_deadline = (subscription.status == SubscriptionStatus::Cancelled)
            .then(|| subscription.grace_deadline(self.grace_days));

        Ok(Some(SubscriptionSnapshot {
            days_remaining: subscription.days_remaining(now),
            grace_deadline,
            subscription,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::foundation::SubscriptionId;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    #[tokio::test]
    async fn returns_none_without_subscription() {
        let store = Arc::new(InMemoryBillingStore::new());
        let handler = GetSubscriptionHandler::new(store, 7);

        let result = handler
            .handle(GetSubscriptionQuery {
                tenant_id: TenantId::new(),
            })
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn cancelled_subscription_exposes_grace_deadline() {
        let store = Arc::new(InMemoryBillingStore::new());
        let tenant_id = TenantId::new();
        let mut sub = Subscription::start(SubscriptionId::new(), tenant_id, ts("2026-01-15T00:00:00Z"));
        sub.cancel(ts("2026-01-20T00:00:00Z")).unwrap();
        store.seed_subscription(sub);

        let handler = GetSubscriptionHandler::new(store, 7);
        let snapshot = handler
            .handle(GetSubscriptionQuery { tenant_id })
            .await
            .unwrap()
            .unwrap();

        // period_end Feb 14 + 7 days grace
        assert_eq!(snapshot.grace_deadline, Some(ts("2026-02-21T00:00:00Z")));
    }

    #[tokio::test]
    async fn active_subscription_has_no_grace_deadline() {
        let store = Arc::new(InMemoryBillingStore::new());
        let tenant_id = TenantId::new();
        store.seed_subscription(Subscription::start(
            SubscriptionId::new(),
            tenant_id,
            ts("2026-01-15T00:00:00Z"),
        ));

        let handler = GetSubscriptionHandler::new(store, 7);
        let snapshot = handler
            .handle(GetSubscriptionQuery { tenant_id })
            .await
            .unwrap()
            .unwrap();

        assert!(snapshot.grace_deadline.is_none());
    }
}
