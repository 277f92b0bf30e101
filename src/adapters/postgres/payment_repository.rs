//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId};
use crate::ports::{PaymentRepository, SettleWrite};

use super::rows::PaymentRow;

const SELECT_COLUMNS: &str = r#"
    SELECT id, tenant_id, user_id, payment_type, amount, status,
           transaction_id, metadata, created_at, updated_at
    FROM payments
"#;

/// Payment ledger persistence over a sqlx connection pool.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, tenant_id, user_id, payment_type, amount, status,
                transaction_id, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.tenant_id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(payment.payment_type.as_str())
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(&payment.transaction_id)
        .bind(Json(&payment.metadata))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payments_transaction_id_key") {
                    return DomainError::new(
                        ErrorCode::DuplicateTransaction,
                        format!("Transaction {} already recorded", payment.transaction_id),
                    );
                }
            }
            DomainError::database(format!("Failed to insert payment: {}", e))
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to load payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{} WHERE transaction_id = $1", SELECT_COLUMNS))
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to load payment: {}", e)))?;

        row.map(Payment::try_from).transpose()
    }

    async fn settle(&self, payment: &Payment) -> Result<SettleWrite, DomainError> {
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
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to settle payment: {}", e)))?;

        if result.rows_affected() == 0 {
            // Either the row is gone or another settlement won the
            // conditional write; distinguish for the caller.
            let exists = self.find_by_id(&payment.id).await?.is_some();
            if exists {
                return Ok(SettleWrite::AlreadySettled);
            }
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment {} not found", payment.id),
            ));
        }

        Ok(SettleWrite::Applied)
    }
}
