//! Axum router configuration for the billing endpoints.

use axum::routing::{get, post};
use axum::{middleware, Router};

use super::super::middleware::{admin_gate, TenantGateState};
use super::handlers::{
    cancel_subscription, gateway_callback, get_subscription, process_payment,
    reactivate_subscription, start_setup_payment, PaymentsAppState,
};

/// Owner-facing routes. Run behind the admin tenant gate: reachable while
/// the tenant is inactive so the owner can pay.
///
/// - `POST /payments/setup` - start the setup-fee checkout
/// - `GET /payments/subscription` - subscription snapshot
/// - `POST /payments/subscription/cancel` - owner cancellation
/// - `POST /payments/subscription/reactivate` - owner reactivation
pub fn owner_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/payments/setup", post(start_setup_payment))
        .route("/payments/subscription", get(get_subscription))
        .route("/payments/subscription/cancel", post(cancel_subscription))
        .route(
            "/payments/subscription/reactivate",
            post(reactivate_subscription),
        )
}

/// Gateway-facing routes. No tenant gate and no user authentication; the
/// callback is verified by signature (when configured) and the mock
/// settlement path stands in for the gateway itself.
///
/// - `POST /payments/:payment_id/process` - synchronous mock settlement
/// - `POST /bog/callback` - asynchronous provider callback (raw body)
pub fn gateway_routes() -> Router<PaymentsAppState> {
    Router::new()
        .route("/payments/:payment_id/process", post(process_payment))
        .route("/bog/callback", post(gateway_callback))
}

/// Complete billing router with the tenant gate applied to owner routes.
pub fn billing_router(state: PaymentsAppState, gate: TenantGateState) -> Router {
    let owner = owner_routes().layer(middleware::from_fn_with_state(gate, admin_gate));

    Router::new()
        .merge(owner)
        .merge(gateway_routes())
        .with_state(state)
}
