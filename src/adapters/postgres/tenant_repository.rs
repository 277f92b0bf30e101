//! PostgreSQL implementation of TenantRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId};
use crate::domain::tenancy::{StoreHost, Tenant};
use crate::ports::TenantRepository;

use super::rows::TenantRow;

/// Tenant persistence over a sqlx connection pool.
pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn save(&self, tenant: &Tenant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, subdomain, custom_domain, owner_id, is_active,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(&tenant.custom_domain)
        .bind(tenant.owner_id.as_str())
        .bind(tenant.is_active)
        .bind(tenant.created_at.as_datetime())
        .bind(tenant.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if matches!(
                    db_err.constraint(),
                    Some("tenants_subdomain_key") | Some("tenants_custom_domain_key")
                ) {
                    return DomainError::validation(
                        "subdomain",
                        "Subdomain or custom domain already taken",
                    );
                }
            }
            DomainError::database(format!("Failed to save tenant: {}", e))
        })?;

        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                name = $2,
                subdomain = $3,
                custom_domain = $4,
                is_active = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(&tenant.custom_domain)
        .bind(tenant.is_active)
        .bind(tenant.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update tenant: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::TenantNotFound,
                "Tenant not found",
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
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

    async fn find_by_host(&self, host: &StoreHost) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = match host {
            StoreHost::Subdomain(label) => {
                sqlx::query_as(
                    r#"
                    SELECT id, name, subdomain, custom_domain, owner_id, is_active,
                           created_at, updated_at
                    FROM tenants
                    WHERE subdomain = $1
                    "#,
                )
                .bind(label)
                .fetch_optional(&self.pool)
                .await
            }
            StoreHost::CustomDomain(domain) => {
                sqlx::query_as(
                    r#"
                    SELECT id, name, subdomain, custom_domain, owner_id, is_active,
                           created_at, updated_at
                    FROM tenants
                    WHERE custom_domain = $1
                    "#,
                )
                .bind(domain)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| DomainError::database(format!("Failed to resolve host: {}", e)))?;

        row.map(Tenant::try_from).transpose()
    }
}
