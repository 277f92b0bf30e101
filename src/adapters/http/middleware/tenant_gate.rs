//! Tenant resolution and access gating middleware.
//!
//! Resolves the tenant from the request's Host header, loads its
//! subscription, runs the access policy, and injects a [`TenantContext`]
//! extension for downstream handlers. Read-only: the gate never writes
//! tenant or subscription state.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::domain::billing::Subscription;
use crate::domain::foundation::Timestamp;
use crate::domain::tenancy::{
    AccessDecision, AccessPolicy, BlockedReason, GraceWarning, StoreHost, Tenant, TenantAccessGate,
};
use crate::ports::{SubscriptionRepository, TenantRepository};

use super::super::ApiError;

/// Dependencies the gate needs.
#[derive(Clone)]
pub struct TenantGateState {
    pub tenants: Arc<dyn TenantRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub base_domain: String,
}

/// Resolved tenant attached to gated requests.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: Tenant,
    pub subscription: Option<Subscription>,
    /// Grace advisory for the owner-facing UI, when the subscription is
    /// cancelled but not yet expired.
    pub warning: Option<GraceWarning>,
}

/// Gate for owner/admin routes: reachable even when the tenant is inactive,
/// so the owner can get to the billing UI and pay.
pub async fn admin_gate(
    State(state): State<TenantGateState>,
    req: Request,
    next: Next,
) -> Response {
    gate(state, req, next, AccessPolicy::Admin).await
}

/// Gate for public storefront routes: requires an active tenant.
pub async fn storefront_gate(
    State(state): State<TenantGateState>,
    req: Request,
    next: Next,
) -> Response {
    gate(state, req, next, AccessPolicy::Storefront).await
}

async fn gate(
    state: TenantGateState,
    mut req: Request,
    next: Next,
    policy: AccessPolicy,
) -> Response {
    let Some(host_header) = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
    else {
        return ApiError::bad_host("Missing Host header").into_response();
    };

    let host = match StoreHost::parse(host_header, &state.base_domain) {
        Ok(host) => host,
        Err(e) => return ApiError::bad_host(e.to_string()).into_response(),
    };

    let tenant = match state.tenants.find_by_host(&host).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => return ApiError::unknown_tenant().into_response(),
        Err(e) => return ApiError::from(crate::domain::billing::BillingError::from(e)).into_response(),
    };

    let subscription = match state.subscriptions.find_by_tenant(&tenant.id).await {
        Ok(subscription) => subscription,
        Err(e) => return ApiError::from(crate::domain::billing::BillingError::from(e)).into_response(),
    };

    match TenantAccessGate::decide(policy, &tenant, subscription.as_ref(), Timestamp::now()) {
        AccessDecision::Granted { warning } => {
            req.extensions_mut().insert(TenantContext {
                tenant,
                subscription,
                warning,
            });
            next.run(req).await
        }
        AccessDecision::Blocked(BlockedReason::StoreInactive) => {
            ApiError::store_inactive().into_response()
        }
    }
}
