//! Tenancy bounded context.
//!
//! Tenants (stores), host-header resolution, and the per-request access gate
//! that decides whether a tenant may serve admin or storefront traffic.

mod access;
mod host;
mod tenant;

pub use access::{AccessDecision, AccessPolicy, BlockedReason, GraceWarning, TenantAccessGate};
pub use host::StoreHost;
pub use tenant::Tenant;
