//! Subscription lifecycle service.
//!
//! The single place that applies lifecycle transitions against a tenant +
//! subscription pair. Every method loads the pair, applies the aggregate
//! transition, and commits the result through [`BillingStore`] as one atomic
//! write - the subscription row and the tenant activation flag are never
//! observable out of sync, and payment-driven transitions settle the payment
//! in the same transaction.
//!
//! Each committed transition publishes one audit event. The audit sink is
//! fire-and-forget: a publish failure is logged and does not undo or fail
//! the transition.

use std::sync::Arc;

use crate::domain::foundation::{EventId, SubscriptionId, TenantId, Timestamp};
use crate::domain::tenancy::Tenant;
use crate::ports::{BillingStore, CommitOutcome, EventPublisher, TransitionCommit};

use super::{BillingError, BillingEvent, Payment, Subscription, SubscriptionStatus};

/// Applies lifecycle transitions atomically.
pub struct SubscriptionLifecycle {
    store: Arc<dyn BillingStore>,
    audit: Arc<dyn EventPublisher>,
}

impl SubscriptionLifecycle {
    pub fn new(store: Arc<dyn BillingStore>, audit: Arc<dyn EventPublisher>) -> Self {
        Self { store, audit }
    }

    /// Successful setup-fee payment: create the subscription, or restart a
    /// TRIAL/EXPIRED one. The tenant is activated in the same commit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tenant does not exist
    /// - `InvalidState` if the subscription is already ACTIVE
    /// - `Conflict` if a concurrent delivery settled the payment first
    pub async fn activate(
        &self,
        tenant_id: &TenantId,
        payment: Option<&Payment>,
        now: Timestamp,
    ) -> Result<Subscription, BillingError> {
        let mut tenant = self.load_tenant(tenant_id).await?;

        let (subscription, event) = match self.store.load_subscription(tenant_id).await? {
            None => {
                let sub = Subscription::start(SubscriptionId::new(), *tenant_id, now);
                let event = BillingEvent::SubscriptionActivated {
                    event_id: EventId::new(),
                    subscription_id: sub.id,
                    tenant_id: *tenant_id,
                    period_start: sub.current_period_start,
                    period_end: sub.current_period_end,
                    occurred_at: now,
                };
                (sub, event)
            }
            Some(mut sub) => match sub.status {
                SubscriptionStatus::Trial | SubscriptionStatus::Expired => {
                    sub.restart(now)?;
                    let event = BillingEvent::SubscriptionActivated {
                        event_id: EventId::new(),
                        subscription_id: sub.id,
                        tenant_id: *tenant_id,
                        period_start: sub.current_period_start,
                        period_end: sub.current_period_end,
                        occurred_at: now,
                    };
                    (sub, event)
                }
                // A setup fee landing during grace behaves like a renewal.
                SubscriptionStatus::Cancelled => {
                    sub.renew(now)?;
                    let event = BillingEvent::SubscriptionRenewed {
                        event_id: EventId::new(),
                        subscription_id: sub.id,
                        tenant_id: *tenant_id,
                        new_period_start: sub.current_period_start,
                        new_period_end: sub.current_period_end,
                        occurred_at: now,
                    };
                    (sub, event)
                }
                SubscriptionStatus::Active => {
                    return Err(BillingError::invalid_state("ACTIVE", "activate"));
                }
            },
        };

        tenant.activate(now);
        self.commit_and_publish(&tenant, &subscription, payment, event)
            .await?;
        Ok(subscription)
    }

    /// Successful renewal payment: extend the period, or restart it when the
    /// renewal lands after a lapse or expiry. Clears `cancelled_at` and makes
    /// sure the tenant is active.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tenant has no subscription
    /// - `Conflict` if a concurrent delivery settled the payment first
    pub async fn renew(
        &self,
        tenant_id: &TenantId,
        payment: Option<&Payment>,
        now: Timestamp,
    ) -> Result<Subscription, BillingError> {
        let mut tenant = self.load_tenant(tenant_id).await?;
        let mut subscription = self.require_subscription(tenant_id).await?;

        subscription.renew(now)?;
        tenant.activate(now);

        let event = BillingEvent::SubscriptionRenewed {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            tenant_id: *tenant_id,
            new_period_start: subscription.current_period_start,
            new_period_end: subscription.current_period_end,
            occurred_at: now,
        };
        self.commit_and_publish(&tenant, &subscription, payment, event)
            .await?;
        Ok(subscription)
    }

    /// Reconciliation lapse: ACTIVE -> CANCELLED. The tenant flag is left
    /// untouched; the grace window keeps the store reachable.
    pub async fn lapse(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<Subscription, BillingError> {
        let tenant = self.load_tenant(tenant_id).await?;
        let mut subscription = self.require_subscription(tenant_id).await?;

        subscription.lapse(now)?;

        let event = BillingEvent::SubscriptionLapsed {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            tenant_id: *tenant_id,
            period_end: subscription.current_period_end,
            occurred_at: now,
        };
        self.commit_and_publish(&tenant, &subscription, None, event)
            .await?;
        Ok(subscription)
    }

    /// Owner-requested cancellation: ACTIVE -> CANCELLED, effective at the
    /// period end. The tenant stays active until then.
    pub async fn cancel(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<Subscription, BillingError> {
        let tenant = self.load_tenant(tenant_id).await?;
        let mut subscription = self.require_subscription(tenant_id).await?;

        subscription.cancel(now)?;

        let event = BillingEvent::SubscriptionCancelled {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            tenant_id: *tenant_id,
            effective_at: subscription.current_period_end,
            occurred_at: now,
        };
        self.commit_and_publish(&tenant, &subscription, None, event)
            .await?;
        Ok(subscription)
    }

    /// Reconciliation expiry: CANCELLED (grace exhausted) or ended TRIAL ->
    /// EXPIRED. Deactivates the tenant in the same commit.
    pub async fn expire(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<Subscription, BillingError> {
        let mut tenant = self.load_tenant(tenant_id).await?;
        let mut subscription = self.require_subscription(tenant_id).await?;

        subscription.expire(now)?;
        tenant.deactivate(now);

        let event = BillingEvent::SubscriptionExpired {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            tenant_id: *tenant_id,
            occurred_at: now,
        };
        self.commit_and_publish(&tenant, &subscription, None, event)
            .await?;
        Ok(subscription)
    }

    /// Owner reactivation inside the grace window: CANCELLED -> ACTIVE with
    /// no payment and no period change.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the grace window has elapsed or the subscription
    ///   is not CANCELLED; the caller routes EXPIRED subscriptions through
    ///   the paid reactivation path instead
    pub async fn reactivate_in_grace(
        &self,
        tenant_id: &TenantId,
        grace_days: u32,
        now: Timestamp,
    ) -> Result<Subscription, BillingError> {
        let tenant = self.load_tenant(tenant_id).await?;
        let mut subscription = self.require_subscription(tenant_id).await?;

        subscription.reactivate_in_grace(now, grace_days)?;

        let event = BillingEvent::SubscriptionReactivated {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            tenant_id: *tenant_id,
            occurred_at: now,
        };
        self.commit_and_publish(&tenant, &subscription, None, event)
            .await?;
        Ok(subscription)
    }

    async fn load_tenant(&self, tenant_id: &TenantId) -> Result<Tenant, BillingError> {
        self.store
            .load_tenant(tenant_id)
            .await?
            .ok_or_else(|| BillingError::not_found("tenant", tenant_id.to_string()))
    }

    async fn require_subscription(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Subscription, BillingError> {
        self.store
            .load_subscription(tenant_id)
            .await?
            .ok_or_else(|| BillingError::not_found("subscription", tenant_id.to_string()))
    }

    async fn commit_and_publish(
        &self,
        tenant: &Tenant,
        subscription: &Subscription,
        payment: Option<&Payment>,
        event: BillingEvent,
    ) -> Result<(), BillingError> {
        let outcome = self
            .store
            .commit_transition(TransitionCommit {
                tenant,
                subscription,
                payment,
            })
            .await?;

        match outcome {
            CommitOutcome::Applied => {
                if let Err(e) = self.audit.publish(event.to_envelope()).await {
                    tracing::warn!(
                        error = %e,
                        event_type = event.event_type(),
                        "Failed to publish audit event"
                    );
                }
                Ok(())
            }
            CommitOutcome::PaymentAlreadySettled => Err(BillingError::conflict(
                "Payment was settled by a concurrent delivery",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::foundation::UserId;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn new_tenant(store: &InMemoryBillingStore) -> TenantId {
        let tenant = Tenant::new(
            TenantId::new(),
            "Acme",
            "acme",
            UserId::new("owner-1").unwrap(),
            ts("2026-01-01T00:00:00Z"),
        )
        .unwrap();
        let id = tenant.id;
        store.seed_tenant(tenant);
        id
    }

    fn lifecycle(
        store: &Arc<InMemoryBillingStore>,
        bus: &Arc<InMemoryEventBus>,
    ) -> SubscriptionLifecycle {
        SubscriptionLifecycle::new(store.clone(), bus.clone())
    }

    #[tokio::test]
    async fn activate_creates_subscription_and_flips_tenant_flag() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        let now = ts("2026-01-15T00:00:00Z");
        let sub = lc.activate(&tenant_id, None, now).await.unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_end, ts("2026-02-14T00:00:00Z"));
        assert!(store.tenant(&tenant_id).unwrap().is_active);
        assert_eq!(bus.event_types(), vec!["subscription.activated"]);
    }

    #[tokio::test]
    async fn activate_twice_is_rejected() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        let result = lc
            .activate(&tenant_id, None, ts("2026-01-16T00:00:00Z"))
            .await;

        assert!(matches!(result, Err(BillingError::InvalidState { .. })));
        // Still exactly one subscription row.
        assert!(store.subscription(&tenant_id).is_some());
    }

    #[tokio::test]
    async fn activate_unknown_tenant_fails() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let lc = lifecycle(&store, &bus);

        let result = lc
            .activate(&TenantId::new(), None, ts("2026-01-15T00:00:00Z"))
            .await;
        assert!(matches!(result, Err(BillingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn renew_extends_and_keeps_tenant_active() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        let sub = lc
            .renew(&tenant_id, None, ts("2026-02-10T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(sub.current_period_start, ts("2026-02-15T00:00:00Z"));
        assert!(store.tenant(&tenant_id).unwrap().is_active);
    }

    #[tokio::test]
    async fn lapse_leaves_tenant_active_during_grace() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        let sub = lc.lapse(&tenant_id, ts("2026-02-15T01:00:00Z")).await.unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.cancelled_at.is_some());
        assert!(
            store.tenant(&tenant_id).unwrap().is_active,
            "grace period keeps the tenant reachable"
        );
    }

    #[tokio::test]
    async fn expire_deactivates_tenant() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        lc.lapse(&tenant_id, ts("2026-02-15T01:00:00Z")).await.unwrap();
        let sub = lc.expire(&tenant_id, ts("2026-02-25T00:00:00Z")).await.unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert!(!store.tenant(&tenant_id).unwrap().is_active);
        assert_eq!(
            bus.event_types(),
            vec![
                "subscription.activated",
                "subscription.lapsed",
                "subscription.expired"
            ]
        );
    }

    #[tokio::test]
    async fn reactivate_in_grace_needs_no_payment() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        lc.cancel(&tenant_id, ts("2026-01-20T00:00:00Z")).await.unwrap();

        let before = store.subscription(&tenant_id).unwrap();
        let sub = lc
            .reactivate_in_grace(&tenant_id, 7, ts("2026-02-01T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_end, before.current_period_end);
        assert!(sub.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn reactivate_after_grace_is_rejected() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        lc.lapse(&tenant_id, ts("2026-02-15T00:00:00Z")).await.unwrap();

        // period_end Feb 14 + 7 grace days = Feb 21
        let result = lc
            .reactivate_in_grace(&tenant_id, 7, ts("2026-02-22T00:00:00Z"))
            .await;
        assert!(matches!(result, Err(BillingError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn activate_after_expiry_restarts_period() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        lc.lapse(&tenant_id, ts("2026-02-15T00:00:00Z")).await.unwrap();
        lc.expire(&tenant_id, ts("2026-02-25T00:00:00Z")).await.unwrap();

        let sub = lc
            .activate(&tenant_id, None, ts("2026-04-01T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start, ts("2026-04-01T00:00:00Z"));
        assert!(store.tenant(&tenant_id).unwrap().is_active);
    }

    #[tokio::test]
    async fn renewal_during_grace_reactivates() {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let tenant_id = new_tenant(&store);
        let lc = lifecycle(&store, &bus);

        lc.activate(&tenant_id, None, ts("2026-01-15T00:00:00Z"))
            .await
            .unwrap();
        lc.lapse(&tenant_id, ts("2026-02-15T00:00:00Z")).await.unwrap();

        let sub = lc
            .renew(&tenant_id, None, ts("2026-02-17T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.cancelled_at.is_none());
        // Renewal landed after the period end, so it restarts from now.
        assert_eq!(sub.current_period_start, ts("2026-02-17T00:00:00Z"));
    }
}
