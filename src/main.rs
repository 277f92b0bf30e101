//! StoreForge billing service binary.
//!
//! Loads configuration, wires the Postgres adapters into the domain
//! services, starts the reconciliation scheduler, and serves the HTTP API
//! until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use storeforge::adapters::events::TracingAuditLog;
use storeforge::adapters::http::middleware::TenantGateState;
use storeforge::adapters::http::payments::{billing_router, PaymentsAppState};
use storeforge::adapters::postgres::{
    PostgresBillingStore, PostgresPaymentRepository, PostgresSubscriptionRepository,
    PostgresTenantRepository,
};
use storeforge::adapters::scheduler::{ReconciliationConfig, ReconciliationScheduler};
use storeforge::config::AppConfig;
use storeforge::domain::billing::{
    CallbackVerifier, HmacCallbackVerifier, NoopVerifier, PaymentLedger, SubscriptionLifecycle,
    WebhookIngestor,
};
use storeforge::ports::{
    BillingStore, EventPublisher, PaymentRepository, SubscriptionRepository, TenantRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.server.log_level)?)
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // Ports
    let billing_store: Arc<dyn BillingStore> = Arc::new(PostgresBillingStore::new(pool.clone()));
    let tenants: Arc<dyn TenantRepository> = Arc::new(PostgresTenantRepository::new(pool.clone()));
    let subscriptions: Arc<dyn SubscriptionRepository> =
        Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let payments: Arc<dyn PaymentRepository> = Arc::new(PostgresPaymentRepository::new(pool));
    let audit: Arc<dyn EventPublisher> = Arc::new(TracingAuditLog::new());

    // Domain services
    let lifecycle = Arc::new(SubscriptionLifecycle::new(billing_store, audit.clone()));
    let ledger = Arc::new(PaymentLedger::new(
        payments.clone(),
        lifecycle.clone(),
        config.billing.prices(),
        audit,
    ));
    let verifier: Arc<dyn CallbackVerifier> = match &config.billing.callback_secret {
        Some(secret) => {
            tracing::info!("Callback signature verification enabled");
            Arc::new(HmacCallbackVerifier::new(secret.clone()))
        }
        None => {
            tracing::warn!("Callback signature verification disabled");
            Arc::new(NoopVerifier)
        }
    };
    let ingestor = Arc::new(WebhookIngestor::new(
        verifier,
        ledger.clone(),
        payments.clone(),
    ));

    // Reconciliation scheduler
    let scheduler = Arc::new(ReconciliationScheduler::with_config(
        subscriptions.clone(),
        lifecycle.clone(),
        ReconciliationConfig::default()
            .with_interval(config.scheduler.interval())
            .with_grace_days(config.billing.grace_period_days),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };

    // HTTP
    let state = PaymentsAppState {
        ledger,
        lifecycle,
        ingestor,
        subscriptions: subscriptions.clone(),
        grace_days: config.billing.grace_period_days,
    };
    let gate = TenantGateState {
        tenants,
        subscriptions,
        base_domain: config.server.base_domain.clone(),
    };

    let mut app = billing_router(state, gate)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if !origins.is_empty() {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "StoreForge billing service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    scheduler_task.await?;
    Ok(())
}
