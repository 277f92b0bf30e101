//! Reconciliation scheduler - the recurring subscription sweep.
//!
//! Ages subscriptions without any external trigger: ACTIVE rows whose period
//! has ended lapse into CANCELLED, and CANCELLED rows past the grace cutoff
//! expire. Lapse runs before expiry inside one tick; with a positive grace
//! window a subscription can never match both sweeps in the same pass, so no
//! tenant is processed twice.
//!
//! The service owns an explicit `run`/shutdown lifecycle and a
//! tick-in-progress guard: if a tick outlives the interval the next firing
//! is skipped, not overlapped. The deployment assumes a single scheduler
//! instance.
//!
//! Per-tenant failures are collected into the report and logged; they never
//! abort the remaining batch, and there is no in-tick retry - the row still
//! matches the sweep predicate, so the next tick picks it up again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::billing::{BillingError, SubscriptionLifecycle};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::SubscriptionRepository;

/// Configuration for the reconciliation scheduler.
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// How often to run the sweep.
    pub interval: Duration,

    /// Days a CANCELLED subscription stays reachable past its period end.
    pub grace_days: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            grace_days: 7,
        }
    }
}

impl ReconciliationConfig {
    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the grace period length.
    pub fn with_grace_days(mut self, days: u32) -> Self {
        self.grace_days = days;
        self
    }
}

/// One tenant that failed during a sweep.
#[derive(Debug, Clone)]
pub struct SweepError {
    pub tenant_id: TenantId,
    pub error: String,
}

/// Result of one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Tenants transitioned successfully.
    pub processed: usize,

    /// Tenants that failed; surfaced to ops logging, never re-raised.
    pub errors: Vec<SweepError>,
}

/// Result of one full reconciliation tick.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    /// ACTIVE -> CANCELLED transitions.
    pub lapsed: SweepOutcome,

    /// CANCELLED -> EXPIRED transitions.
    pub expired: SweepOutcome,

    /// TRIAL -> EXPIRED transitions.
    pub trials_expired: SweepOutcome,
}

impl ReconciliationReport {
    /// Total tenants transitioned across all sweeps.
    pub fn total_processed(&self) -> usize {
        self.lapsed.processed + self.expired.processed + self.trials_expired.processed
    }

    /// Total per-tenant failures across all sweeps.
    pub fn total_errors(&self) -> usize {
        self.lapsed.errors.len() + self.expired.errors.len() + self.trials_expired.errors.len()
    }
}

/// Background service aging subscriptions through grace into expiry.
pub struct ReconciliationScheduler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    lifecycle: Arc<SubscriptionLifecycle>,
    config: ReconciliationConfig,
    in_progress: AtomicBool,
}

impl ReconciliationScheduler {
    /// Creates a scheduler with default configuration.
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        lifecycle: Arc<SubscriptionLifecycle>,
    ) -> Self {
        Self::with_config(subscriptions, lifecycle, ReconciliationConfig::default())
    }

    /// Creates a scheduler with custom configuration.
    pub fn with_config(
        subscriptions: Arc<dyn SubscriptionRepository>,
        lifecycle: Arc<SubscriptionLifecycle>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            subscriptions,
            lifecycle,
            config,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Runs the sweep loop until the shutdown signal flips to `true`.
    ///
    /// The first tick fires immediately at startup, then every
    /// `config.interval`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Reconciliation scheduler shutting down");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Runs one guarded tick: skips entirely if a previous tick is still in
    /// flight.
    pub async fn tick(&self) -> Option<ReconciliationReport> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            tracing::warn!("Reconciliation tick still running; skipping this firing");
            return None;
        }

        let result = self.reconcile(Timestamp::now()).await;
        self.in_progress.store(false, Ordering::SeqCst);

        match result {
            Ok(report) => {
                if report.total_processed() > 0 || report.total_errors() > 0 {
                    tracing::info!(
                        lapsed = report.lapsed.processed,
                        expired = report.expired.processed,
                        trials_expired = report.trials_expired.processed,
                        errors = report.total_errors(),
                        "Reconciliation tick finished"
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation tick failed before sweeping");
                None
            }
        }
    }

    /// Runs the sweeps once at the given instant.
    ///
    /// Idempotent: rows already transitioned no longer match the sweep
    /// predicates, so a back-to-back rerun processes zero tenants.
    ///
    /// # Errors
    ///
    /// Only query failures abort the tick; per-tenant transition failures
    /// land in the report.
    pub async fn reconcile(&self, now: Timestamp) -> Result<ReconciliationReport, BillingError> {
        let mut report = ReconciliationReport::default();

        // 1. Lapse sweep: ACTIVE past period end.
        let due = self
            .subscriptions
            .find_active_with_period_end_before(now)
            .await?;
        for subscription in due {
            match self.lifecycle.lapse(&subscription.tenant_id, now).await {
                Ok(_) => report.lapsed.processed += 1,
                Err(e) => report.lapsed.errors.push(sweep_error(subscription.tenant_id, e)),
            }
        }

        // 2. Expiry sweep: CANCELLED past the grace cutoff.
        let cutoff = now.minus_days(i64::from(self.config.grace_days));
        let due = self
            .subscriptions
            .find_cancelled_with_period_end_before(cutoff)
            .await?;
        for subscription in due {
            match self.lifecycle.expire(&subscription.tenant_id, now).await {
                Ok(_) => report.expired.processed += 1,
                Err(e) => report.expired.errors.push(sweep_error(subscription.tenant_id, e)),
            }
        }

        // 3. Trial sweep: TRIAL past period end.
        let due = self
            .subscriptions
            .find_trials_with_period_end_before(now)
            .await?;
        for subscription in due {
            match self.lifecycle.expire(&subscription.tenant_id, now).await {
                Ok(_) => report.trials_expired.processed += 1,
                Err(e) => report
                    .trials_expired
                    .errors
                    .push(sweep_error(subscription.tenant_id, e)),
            }
        }

        Ok(report)
    }
}

fn sweep_error(tenant_id: TenantId, error: BillingError) -> SweepError {
    tracing::warn!(tenant_id = %tenant_id, error = %error, "Reconciliation skipped tenant");
    SweepError {
        tenant_id,
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{Subscription, SubscriptionStatus};
    use crate::domain::foundation::{SubscriptionId, UserId};
    use crate::domain::tenancy::Tenant;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        scheduler: ReconciliationScheduler,
    }

    fn fixture(grace_days: u32) -> Fixture {
        let store = Arc::new(InMemoryBillingStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let lifecycle = Arc::new(SubscriptionLifecycle::new(store.clone(), bus));
        let scheduler = ReconciliationScheduler::with_config(
            store.clone(),
            lifecycle,
            ReconciliationConfig::default().with_grace_days(grace_days),
        );
        Fixture { store, scheduler }
    }

    fn seed_tenant(store: &InMemoryBillingStore, subdomain: &str, active: bool) -> TenantId {
        let mut tenant = Tenant::new(
            TenantId::new(),
            subdomain,
            subdomain,
            UserId::new("owner-1").unwrap(),
            ts("2026-01-01T00:00:00Z"),
        )
        .unwrap();
        if active {
            tenant.activate(ts("2026-01-01T00:00:00Z"));
        }
        let id = tenant.id;
        store.seed_tenant(tenant);
        id
    }

    fn seed_active(store: &InMemoryBillingStore, tenant_id: TenantId, start: &str) {
        store.seed_subscription(Subscription::start(
            SubscriptionId::new(),
            tenant_id,
            ts(start),
        ));
    }

    fn seed_cancelled(store: &InMemoryBillingStore, tenant_id: TenantId, start: &str, cancelled: &str) {
        let mut sub = Subscription::start(SubscriptionId::new(), tenant_id, ts(start));
        sub.lapse(ts(cancelled)).unwrap();
        store.seed_subscription(sub);
    }

    #[tokio::test]
    async fn lapse_sweep_cancels_overdue_actives_and_keeps_tenant_active() {
        let f = fixture(7);
        let tenant_id = seed_tenant(&f.store, "acme", true);
        seed_active(&f.store, tenant_id, "2026-01-01T00:00:00Z"); // ends Jan 31

        let report = f.scheduler.reconcile(ts("2026-02-02T00:00:00Z")).await.unwrap();

        assert_eq!(report.lapsed.processed, 1);
        assert_eq!(report.expired.processed, 0);
        let sub = f.store.subscription(&tenant_id).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.cancelled_at.is_some());
        assert!(f.store.tenant(&tenant_id).unwrap().is_active);
    }

    #[tokio::test]
    async fn expiry_sweep_respects_the_grace_boundary() {
        let f = fixture(7);

        // Period ended 6 days ago: inside grace, must NOT expire.
        let inside = seed_tenant(&f.store, "inside", true);
        seed_cancelled(&f.store, inside, "2026-01-06T00:00:00Z", "2026-02-05T12:00:00Z");
        // period_end = Feb 5

        // Period ended 8 days ago: past grace, MUST expire.
        let outside = seed_tenant(&f.store, "outside", true);
        seed_cancelled(&f.store, outside, "2026-01-04T00:00:00Z", "2026-02-03T12:00:00Z");
        // period_end = Feb 3

        let now = ts("2026-02-11T00:00:00Z"); // cutoff = Feb 4
        let report = f.scheduler.reconcile(now).await.unwrap();

        assert_eq!(report.expired.processed, 1);
        assert_eq!(
            f.store.subscription(&inside).unwrap().status,
            SubscriptionStatus::Cancelled
        );
        let expired = f.store.subscription(&outside).unwrap();
        assert_eq!(expired.status, SubscriptionStatus::Expired);
        assert!(!f.store.tenant(&outside).unwrap().is_active);
    }

    #[tokio::test]
    async fn second_run_with_no_elapsed_time_processes_nothing() {
        let f = fixture(7);
        let tenant_id = seed_tenant(&f.store, "acme", true);
        seed_active(&f.store, tenant_id, "2026-01-01T00:00:00Z");

        let now = ts("2026-02-02T00:00:00Z");
        let first = f.scheduler.reconcile(now).await.unwrap();
        let second = f.scheduler.reconcile(now).await.unwrap();

        assert_eq!(first.total_processed(), 1);
        assert_eq!(second.total_processed(), 0);
        assert_eq!(second.total_errors(), 0);
    }

    #[tokio::test]
    async fn freshly_lapsed_row_is_not_expired_in_the_same_tick() {
        let f = fixture(7);
        let tenant_id = seed_tenant(&f.store, "acme", true);
        seed_active(&f.store, tenant_id, "2026-01-01T00:00:00Z"); // ends Jan 31

        // One hour past the period end: lapse fires, but the expiry cutoff
        // (period_end < now - grace) is still a week away.
        let report = f.scheduler.reconcile(ts("2026-02-01T01:00:00Z")).await.unwrap();

        assert_eq!(report.lapsed.processed, 1);
        assert_eq!(report.expired.processed, 0);
        assert_eq!(
            f.store.subscription(&tenant_id).unwrap().status,
            SubscriptionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn long_overdue_subscription_catches_up_in_one_tick() {
        let f = fixture(7);
        let tenant_id = seed_tenant(&f.store, "acme", true);
        seed_active(&f.store, tenant_id, "2026-01-01T00:00:00Z"); // ends Jan 31

        // The scheduler was down past the whole grace window. Sweep 1
        // cancels the row, and because its period ended before the grace
        // cutoff, sweep 2 expires it in the same tick.
        let report = f.scheduler.reconcile(ts("2026-02-20T00:00:00Z")).await.unwrap();

        assert_eq!(report.lapsed.processed, 1);
        assert_eq!(report.expired.processed, 1);
        assert_eq!(
            f.store.subscription(&tenant_id).unwrap().status,
            SubscriptionStatus::Expired
        );
    }

    #[tokio::test]
    async fn per_tenant_failures_do_not_stop_the_batch() {
        let f = fixture(7);

        // This subscription's tenant row is missing: the transition fails.
        let ghost = TenantId::new();
        seed_active(&f.store, ghost, "2026-01-01T00:00:00Z");

        let healthy = seed_tenant(&f.store, "acme", true);
        seed_active(&f.store, healthy, "2026-01-01T00:00:00Z");

        let report = f.scheduler.reconcile(ts("2026-02-02T00:00:00Z")).await.unwrap();

        assert_eq!(report.lapsed.processed, 1);
        assert_eq!(report.lapsed.errors.len(), 1);
        assert_eq!(report.lapsed.errors[0].tenant_id, ghost);
        assert_eq!(
            f.store.subscription(&healthy).unwrap().status,
            SubscriptionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn trial_sweep_expires_ended_trials() {
        let f = fixture(7);
        let tenant_id = seed_tenant(&f.store, "acme", true);

        let mut sub = Subscription::start(SubscriptionId::new(), tenant_id, ts("2026-01-01T00:00:00Z"));
        sub.status = SubscriptionStatus::Trial;
        f.store.seed_subscription(sub);

        let report = f.scheduler.reconcile(ts("2026-02-02T00:00:00Z")).await.unwrap();

        assert_eq!(report.trials_expired.processed, 1);
        assert_eq!(
            f.store.subscription(&tenant_id).unwrap().status,
            SubscriptionStatus::Expired
        );
        assert!(!f.store.tenant(&tenant_id).unwrap().is_active);
    }

    #[tokio::test]
    async fn tick_skips_when_already_in_progress() {
        let f = fixture(7);

        f.scheduler.in_progress.store(true, Ordering::SeqCst);
        assert!(f.scheduler.tick().await.is_none());

        f.scheduler.in_progress.store(false, Ordering::SeqCst);
        assert!(f.scheduler.tick().await.is_some());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let f = fixture(7);
        let scheduler = Arc::new(f.scheduler);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = scheduler.clone();
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        handle.await.unwrap();
    }
}
