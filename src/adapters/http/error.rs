//! HTTP error mapping.
//!
//! Translates the billing error taxonomy into status codes and the
//! structured JSON body `{"error": {"code", "message"}}` every endpoint
//! returns on failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::billing::BillingError;

/// Structured error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Error type returned by every HTTP handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// 403 for a caller who is not the tenant's owner.
    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "Only the store owner may perform this action",
        )
    }

    /// 400 for a malformed or missing Host header.
    pub fn bad_host(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_HOST", message)
    }

    /// 404 for a host that resolves to no tenant.
    pub fn unknown_tenant() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "TENANT_NOT_FOUND",
            "No store is registered for this host",
        )
    }

    /// 403 for a storefront whose tenant is switched off.
    pub fn store_inactive() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "STORE_INACTIVE",
            "This store is currently inactive",
        )
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        let status = match &err {
            BillingError::Validation { .. } => StatusCode::BAD_REQUEST,
            BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillingError::Conflict(_) | BillingError::InvalidState { .. } => StatusCode::CONFLICT,
            BillingError::InvalidCallbackSignature => StatusCode::UNAUTHORIZED,
            BillingError::Gateway(_) => StatusCode::BAD_GATEWAY,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.code().to_string(),
            message: err.message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.code, self.message);
        (self.status, Json(body)).into_response()
    }
}
