//! PostgreSQL implementation of BillingStore.
//!
//! The atomic heart of the lifecycle: one `sqlx` transaction covers the
//! conditional payment settlement, the subscription upsert, and the tenant
//! flag update. Any failure rolls the whole commit back.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId};
use crate::domain::billing::Subscription;
use crate::domain::tenancy::Tenant;
use crate::ports::{BillingStore, CommitOutcome, TransitionCommit};

use super::rows::{SubscriptionRow, TenantRow};

/// Atomic tenant + subscription (+ payment) commits over Postgres.
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn load_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, name, subdomain, custom_domain, owner_id, is_active,
                   created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load tenant: {}", e)))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn load_subscription(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, status, current_period_start, current_period_end,
                   next_billing_date, cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn commit_transition(
        &self,
        commit: TransitionCommit<'_>,
    ) -> Result<CommitOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        // 1. Conditional payment settlement. Losing the only-if-PENDING
        // guard aborts the whole commit.
        if let Some(payment) = commit.payment {
            let result = sqlx::query(
                r#"
                UPDATE payments SET
                    status = $2,
                    updated_at = $3
                WHERE id = $1 AND status = 'PENDING'
                "#,
            )
            .bind(payment.id.as_uuid())
            .bind(payment.status.as_str())
            .bind(payment.updated_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to settle payment: {}", e)))?;

            if result.rows_affected() == 0 {
                tx.rollback().await.map_err(|e| {
                    DomainError::database(format!("Failed to roll back: {}", e))
                })?;
                return Ok(CommitOutcome::PaymentAlreadySettled);
            }
        }

        // 2. Subscription upsert. The unique tenant_id constraint enforces
        // at most one subscription per tenant.
        let subscription = commit.subscription;
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, tenant_id, status, current_period_start, current_period_end,
                next_billing_date, cancelled_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                next_billing_date = EXCLUDED.next_billing_date,
                cancelled_at = EXCLUDED.cancelled_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.tenant_id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_start.as_datetime())
        .bind(subscription.current_period_end.as_datetime())
        .bind(subscription.next_billing_date.as_datetime())
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_tenant_id_key") {
                    return DomainError::new(
                        ErrorCode::SubscriptionExists,
                        "Tenant already has a subscription",
                    );
                }
            }
            DomainError::database(format!("Failed to write subscription: {}", e))
        })?;

        // 3. Tenant activation flag.
        let tenant = commit.tenant;
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                is_active = $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(tenant.is_active)
        .bind(tenant.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update tenant: {}", e)))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| DomainError::database(format!("Failed to roll back: {}", e)))?;
            return Err(DomainError::new(
                ErrorCode::TenantNotFound,
                "Tenant vanished during transition",
            ));
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transition: {}", e)))?;

        Ok(CommitOutcome::Applied)
    }
}
