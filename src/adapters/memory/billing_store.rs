//! In-memory implementation of the billing ports.
//!
//! One shared state map behind a single mutex, so `commit_transition` is
//! atomic the same way the Postgres transaction is. Implements every billing
//! port, which lets tests wire the full stack without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::{Payment, PaymentStatus, Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, TenantId, Timestamp};
use crate::domain::tenancy::{StoreHost, Tenant};
use crate::ports::{
    BillingStore, CommitOutcome, PaymentRepository, SettleWrite, SubscriptionRepository,
    TenantRepository, TransitionCommit,
};

#[derive(Default)]
struct State {
    tenants: HashMap<TenantId, Tenant>,
    subscriptions: HashMap<TenantId, Subscription>,
    payments: HashMap<PaymentId, Payment>,
}

/// In-memory billing storage.
#[derive(Default)]
pub struct InMemoryBillingStore {
    state: Mutex<State>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a tenant directly, bypassing the repository contract.
    pub fn seed_tenant(&self, tenant: Tenant) {
        self.state
            .lock()
            .unwrap()
            .tenants
            .insert(tenant.id, tenant);
    }

    /// Seeds a subscription directly.
    pub fn seed_subscription(&self, subscription: Subscription) {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.tenant_id, subscription);
    }

    /// Test inspection: current tenant state.
    pub fn tenant(&self, id: &TenantId) -> Option<Tenant> {
        self.state.lock().unwrap().tenants.get(id).cloned()
    }

    /// Test inspection: current subscription state.
    pub fn subscription(&self, tenant_id: &TenantId) -> Option<Subscription> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .get(tenant_id)
            .cloned()
    }

    /// Test inspection: one payment.
    pub fn payment(&self, id: &PaymentId) -> Option<Payment> {
        self.state.lock().unwrap().payments.get(id).cloned()
    }

    /// Test inspection: all payments.
    pub fn payments(&self) -> Vec<Payment> {
        self.state.lock().unwrap().payments.values().cloned().collect()
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn load_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        Ok(self.state.lock().unwrap().tenants.get(id).cloned())
    }

    async fn load_subscription(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .get(tenant_id)
            .cloned())
    }

    async fn commit_transition(
        &self,
        commit: TransitionCommit<'_>,
    ) -> Result<CommitOutcome, DomainError> {
        let mut state = self.state.lock().unwrap();

        // Payment guard first: a settled row aborts the whole commit.
        if let Some(payment) = commit.payment {
            if let Some(stored) = state.payments.get(&payment.id) {
                if stored.status != PaymentStatus::Pending {
                    return Ok(CommitOutcome::PaymentAlreadySettled);
                }
            }
        }

        if !state.tenants.contains_key(&commit.tenant.id) {
            return Err(DomainError::new(
                ErrorCode::TenantNotFound,
                format!("Tenant {} not found", commit.tenant.id),
            ));
        }

        if let Some(existing) = state.subscriptions.get(&commit.subscription.tenant_id) {
            if existing.id != commit.subscription.id {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionExists,
                    "Tenant already has a subscription",
                ));
            }
        }

        if let Some(payment) = commit.payment {
            state.payments.insert(payment.id, payment.clone());
        }
        state
            .subscriptions
            .insert(commit.subscription.tenant_id, commit.subscription.clone());
        state.tenants.insert(commit.tenant.id, commit.tenant.clone());

        Ok(CommitOutcome::Applied)
    }
}

#[async_trait]
impl TenantRepository for InMemoryBillingStore {
    async fn save(&self, tenant: &Tenant) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let taken = state.tenants.values().any(|t| {
            t.id != tenant.id
                && (t.subdomain == tenant.subdomain
                    || (t.custom_domain.is_some() && t.custom_domain == tenant.custom_domain))
        });
        if taken {
            return Err(DomainError::validation(
                "subdomain",
                "Subdomain or custom domain already taken",
            ));
        }
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        if !state.tenants.contains_key(&tenant.id) {
            return Err(DomainError::new(
                ErrorCode::TenantNotFound,
                format!("Tenant {} not found", tenant.id),
            ));
        }
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        Ok(self.state.lock().unwrap().tenants.get(id).cloned())
    }

    async fn find_by_host(&self, host: &StoreHost) -> Result<Option<Tenant>, DomainError> {
        let state = self.state.lock().unwrap();
        let found = state.tenants.values().find(|t| match host {
            StoreHost::Subdomain(label) => &t.subdomain == label,
            StoreHost::CustomDomain(domain) => t.custom_domain.as_deref() == Some(domain),
        });
        Ok(found.cloned())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .get(tenant_id)
            .cloned())
    }

    async fn find_active_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.filter_by(SubscriptionStatus::Active, cutoff))
    }

    async fn find_cancelled_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.filter_by(SubscriptionStatus::Cancelled, cutoff))
    }

    async fn find_trials_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self.filter_by(SubscriptionStatus::Trial, cutoff))
    }
}

impl InMemoryBillingStore {
    fn filter_by(&self, status: SubscriptionStatus, cutoff: Timestamp) -> Vec<Subscription> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.status == status && s.current_period_end < cutoff)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryBillingStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut state = self.state.lock().unwrap();
        let duplicate = state
            .payments
            .values()
            .any(|p| p.transaction_id == payment.transaction_id);
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::DuplicateTransaction,
                format!("Transaction {} already recorded", payment.transaction_id),
            ));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.state.lock().unwrap().payments.get(id).cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .payments
            .values()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn settle(&self, payment: &Payment) -> Result<SettleWrite, DomainError> {
        let mut state = self.state.lock().unwrap();
        match state.payments.get(&payment.id) {
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment {} not found", payment.id),
            )),
            Some(stored) if stored.status != PaymentStatus::Pending => {
                Ok(SettleWrite::AlreadySettled)
            }
            Some(_) => {
                state.payments.insert(payment.id, payment.clone());
                Ok(SettleWrite::Applied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionId, UserId};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn tenant() -> Tenant {
        Tenant::new(
            TenantId::new(),
            "Acme",
            "acme",
            UserId::new("owner-1").unwrap(),
            ts("2026-01-01T00:00:00Z"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn commit_rejects_second_subscription_for_tenant() {
        let store = InMemoryBillingStore::new();
        let t = tenant();
        store.seed_tenant(t.clone());

        let first = Subscription::start(SubscriptionId::new(), t.id, ts("2026-01-15T00:00:00Z"));
        store
            .commit_transition(TransitionCommit {
                tenant: &t,
                subscription: &first,
                payment: None,
            })
            .await
            .unwrap();

        let second = Subscription::start(SubscriptionId::new(), t.id, ts("2026-02-15T00:00:00Z"));
        let result = store
            .commit_transition(TransitionCommit {
                tenant: &t,
                subscription: &second,
                payment: None,
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.subscription(&t.id).unwrap().id, first.id);
    }

    #[tokio::test]
    async fn commit_reports_settled_payment_race() {
        let store = InMemoryBillingStore::new();
        let t = tenant();
        store.seed_tenant(t.clone());

        let mut payment = Payment::create(
            PaymentId::new(),
            t.id,
            UserId::new("owner-1").unwrap(),
            crate::domain::billing::PaymentType::SetupFee,
            5000,
            "ord_1".to_string(),
            crate::domain::billing::PaymentMetadata::SetupFee { reactivation: false },
            ts("2026-01-15T00:00:00Z"),
        )
        .unwrap();
        PaymentRepository::insert(&store, &payment).await.unwrap();

        // Another delivery settles it first.
        let mut winner = payment.clone();
        winner.succeed(ts("2026-01-15T00:01:00Z")).unwrap();
        PaymentRepository::settle(&store, &winner).await.unwrap();

        payment.succeed(ts("2026-01-15T00:02:00Z")).unwrap();
        let sub = Subscription::start(SubscriptionId::new(), t.id, ts("2026-01-15T00:02:00Z"));
        let outcome = store
            .commit_transition(TransitionCommit {
                tenant: &t,
                subscription: &sub,
                payment: Some(&payment),
            })
            .await
            .unwrap();

        assert_eq!(outcome, CommitOutcome::PaymentAlreadySettled);
        // Rolled back: no subscription row was written.
        assert!(store.subscription(&t.id).is_none());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_transaction_reference() {
        let store = InMemoryBillingStore::new();
        let t = tenant();
        store.seed_tenant(t.clone());

        let make = |id: PaymentId| {
            Payment::create(
                id,
                t.id,
                UserId::new("owner-1").unwrap(),
                crate::domain::billing::PaymentType::SetupFee,
                5000,
                "ord_dup".to_string(),
                crate::domain::billing::PaymentMetadata::SetupFee { reactivation: false },
                ts("2026-01-15T00:00:00Z"),
            )
            .unwrap()
        };

        PaymentRepository::insert(&store, &make(PaymentId::new()))
            .await
            .unwrap();
        let result = PaymentRepository::insert(&store, &make(PaymentId::new())).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sweep_queries_filter_by_status_and_cutoff() {
        let store = InMemoryBillingStore::new();
        let t = tenant();
        store.seed_tenant(t.clone());

        let mut lapsed = Subscription::start(SubscriptionId::new(), t.id, ts("2026-01-01T00:00:00Z"));
        lapsed.lapse(ts("2026-02-01T00:00:00Z")).unwrap();
        store.seed_subscription(lapsed);

        let t2 = Tenant::new(
            TenantId::new(),
            "Beta",
            "beta",
            UserId::new("owner-2").unwrap(),
            ts("2026-01-01T00:00:00Z"),
        )
        .unwrap();
        store.seed_tenant(t2.clone());
        let active = Subscription::start(SubscriptionId::new(), t2.id, ts("2026-01-20T00:00:00Z"));
        store.seed_subscription(active);

        let now = ts("2026-02-05T00:00:00Z");
        let lapse_due = store.find_active_with_period_end_before(now).await.unwrap();
        let expiry_due = store
            .find_cancelled_with_period_end_before(now.minus_days(7))
            .await
            .unwrap();

        // The active one (period ends Feb 19) is not due; the cancelled one
        // (period ended Jan 31) is past the 7-day grace cutoff of Jan 29.
        assert!(lapse_due.is_empty());
        assert_eq!(expiry_due.len(), 0); // Jan 31 is not before Jan 29

        let expiry_due_later = store
            .find_cancelled_with_period_end_before(ts("2026-02-10T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(expiry_due_later.len(), 1);
    }

    #[tokio::test]
    async fn find_by_host_matches_subdomain_and_custom_domain() {
        let store = InMemoryBillingStore::new();
        let mut t = tenant();
        t.custom_domain = Some("shop.acme.ge".to_string());
        TenantRepository::save(&store, &t).await.unwrap();

        let by_sub = store
            .find_by_host(&StoreHost::Subdomain("acme".to_string()))
            .await
            .unwrap();
        assert_eq!(by_sub.map(|t| t.id), Some(t.id));

        let by_domain = store
            .find_by_host(&StoreHost::CustomDomain("shop.acme.ge".to_string()))
            .await
            .unwrap();
        assert_eq!(by_domain.map(|t| t.id), Some(t.id));

        let missing = store
            .find_by_host(&StoreHost::Subdomain("ghost".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
