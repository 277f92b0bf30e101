//! Tenant repository port.
//!
//! Lookup and persistence for Tenant aggregates. The activation flag is
//! written through [`crate::ports::BillingStore`] when a lifecycle transition
//! drives it; the plain `update` here serves the administrator override.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::tenancy::{StoreHost, Tenant};

/// Repository port for Tenant aggregates.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Save a new tenant.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the subdomain or custom domain is taken
    /// - `DatabaseError` on persistence failure
    async fn save(&self, tenant: &Tenant) -> Result<(), DomainError>;

    /// Update an existing tenant.
    ///
    /// # Errors
    ///
    /// - `TenantNotFound` if the tenant doesn't exist
    async fn update(&self, tenant: &Tenant) -> Result<(), DomainError>;

    /// Find a tenant by its ID.
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError>;

    /// Resolve a tenant from a parsed request host.
    ///
    /// Subdomain hosts match the `subdomain` column; custom-domain hosts
    /// match `custom_domain`. Returns `None` for an unknown host.
    async fn find_by_host(&self, host: &StoreHost) -> Result<Option<Tenant>, DomainError>;
}
