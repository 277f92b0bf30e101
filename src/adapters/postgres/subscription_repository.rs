//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::ports::SubscriptionRepository;

use super::rows::SubscriptionRow;

const SELECT_COLUMNS: &str = r#"
    SELECT id, tenant_id, status, current_period_start, current_period_end,
           next_billing_date, cancelled_at, created_at, updated_at
    FROM subscriptions
"#;

/// Subscription lookups over a sqlx connection pool.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn sweep(
        &self,
        status: &str,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE status = $1 AND current_period_end < $2 ORDER BY current_period_end",
            SELECT_COLUMNS
        ))
        .bind(status)
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Sweep query failed: {}", e)))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE tenant_id = $1", SELECT_COLUMNS))
                .bind(tenant_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to load subscription: {}", e))
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_active_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.sweep("ACTIVE", cutoff).await
    }

    async fn find_cancelled_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.sweep("CANCELLED", cutoff).await
    }

    async fn find_trials_with_period_end_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.sweep("TRIAL", cutoff).await
    }
}
