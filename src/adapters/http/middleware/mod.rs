//! HTTP middleware.

mod tenant_gate;

pub use tenant_gate::{admin_gate, storefront_gate, TenantContext, TenantGateState};
