//! HTTP handlers for payment and subscription endpoints.
//!
//! These handlers connect axum routes to the application layer. Owner
//! endpoints run behind the admin tenant gate (the [`TenantContext`]
//! extension) and additionally require the authenticated user to own the
//! resolved tenant.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, GetSubscriptionHandler,
    GetSubscriptionQuery, ProcessPaymentCommand, ProcessPaymentHandler,
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, ReactivationResult,
    StartSetupPaymentCommand, StartSetupPaymentHandler,
};
use crate::domain::billing::{PaymentLedger, Settlement, SubscriptionLifecycle, WebhookIngestor};
use crate::domain::foundation::{PaymentId, Timestamp, UserId};
use crate::ports::SubscriptionRepository;

use super::super::middleware::TenantContext;
use super::super::{ApiError, ErrorResponse};
use super::dto::{
    CallbackAck, GetSubscriptionResponse, PaymentResponse, ProcessPaymentRequest,
    ProcessPaymentResponse, ReactivateResponse, SubscriptionResponse,
};

/// Header carrying the optional callback signature.
const CALLBACK_SIGNATURE_HEADER: &str = "x-callback-signature";

/// Shared application state for the payment endpoints.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub ledger: Arc<PaymentLedger>,
    pub lifecycle: Arc<SubscriptionLifecycle>,
    pub ingestor: Arc<WebhookIngestor>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub grace_days: u32,
}

impl PaymentsAppState {
    pub fn start_setup_payment_handler(&self) -> StartSetupPaymentHandler {
        StartSetupPaymentHandler::new(self.subscriptions.clone(), self.ledger.clone())
    }

    pub fn process_payment_handler(&self) -> ProcessPaymentHandler {
        ProcessPaymentHandler::new(self.ledger.clone())
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.subscriptions.clone(), self.grace_days)
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.lifecycle.clone())
    }

    pub fn reactivate_subscription_handler(&self) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(
            self.subscriptions.clone(),
            self.lifecycle.clone(),
            self.ledger.clone(),
            self.grace_days,
        )
    }
}

/// Authenticated user context extracted from the request.
///
/// The identity provider sits in front of this service; it forwards the
/// verified subject in the X-User-Id header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

fn require_owner(ctx: &TenantContext, user: &AuthenticatedUser) -> Result<(), ApiError> {
    if !ctx.tenant.is_owned_by(&user.user_id) {
        return Err(ApiError::forbidden());
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════════
// Owner endpoints (admin-gated)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments/setup - start the setup-fee checkout for this tenant.
pub async fn start_setup_payment(
    State(state): State<PaymentsAppState>,
    Extension(ctx): Extension<TenantContext>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&ctx, &user)?;

    let payment = state
        .start_setup_payment_handler()
        .handle(StartSetupPaymentCommand {
            tenant_id: ctx.tenant.id,
            user_id: user.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(&payment))))
}

/// GET /payments/subscription - subscription snapshot for this tenant.
pub async fn get_subscription(
    State(state): State<PaymentsAppState>,
    Extension(ctx): Extension<TenantContext>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&ctx, &user)?;

    let snapshot = state
        .get_subscription_handler()
        .handle(GetSubscriptionQuery {
            tenant_id: ctx.tenant.id,
        })
        .await?;

    Ok(Json(GetSubscriptionResponse {
        subscription: snapshot.map(SubscriptionResponse::from),
        warning: ctx.warning,
    }))
}

/// POST /payments/subscription/cancel - owner cancellation.
pub async fn cancel_subscription(
    State(state): State<PaymentsAppState>,
    Extension(ctx): Extension<TenantContext>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&ctx, &user)?;

    let subscription = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand {
            tenant_id: ctx.tenant.id,
        })
        .await?;

    Ok(Json(SubscriptionResponse::from_subscription(&subscription)))
}

/// POST /payments/subscription/reactivate - owner reactivation.
pub async fn reactivate_subscription(
    State(state): State<PaymentsAppState>,
    Extension(ctx): Extension<TenantContext>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    require_owner(&ctx, &user)?;

    let result = state
        .reactivate_subscription_handler()
        .handle(ReactivateSubscriptionCommand {
            tenant_id: ctx.tenant.id,
            user_id: user.user_id,
        })
        .await?;

    let response = match result {
        ReactivationResult::Reactivated(subscription) => ReactivateResponse::Reactivated {
            subscription: SubscriptionResponse::from_subscription(&subscription),
        },
        ReactivationResult::PaymentRequired(payment) => ReactivateResponse::PaymentRequired {
            payment: PaymentResponse::from(&payment),
        },
    };
    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway endpoints (no tenant gate; the provider addresses the platform)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payments/:payment_id/process - synchronous mock-gateway settlement.
pub async fn process_payment(
    State(state): State<PaymentsAppState>,
    Path(payment_id): Path<Uuid>,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let settlement = state
        .process_payment_handler()
        .handle(ProcessPaymentCommand {
            payment_id: PaymentId::from_uuid(payment_id),
            outcome: request.outcome,
        })
        .await?;

    let already_settled = matches!(settlement, Settlement::AlreadySettled(_));
    Ok(Json(ProcessPaymentResponse {
        payment: PaymentResponse::from(settlement.payment()),
        already_settled,
    }))
}

/// POST /bog/callback - asynchronous gateway callback. The body is consumed
/// as raw bytes so signature verification covers the exact wire payload.
pub async fn gateway_callback(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(CALLBACK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state
        .ingestor
        .ingest(&body, signature, Timestamp::now())
        .await?;

    // Every handled disposition (settled, duplicate, ignored) is a 200:
    // the provider retries on anything else.
    Ok(Json(CallbackAck { received: true }))
}
