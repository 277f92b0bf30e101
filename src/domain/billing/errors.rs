//! Billing-specific error types.
//!
//! The billing error taxonomy surfaced to HTTP callers and the scheduler.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | InvalidState | 409 |
//! | InvalidCallbackSignature | 401 |
//! | Gateway | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode};

/// Billing operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Malformed request (bad payment type, bad payload, bad field).
    Validation { field: String, message: String },

    /// Unknown payment, subscription, or tenant.
    NotFound { resource: &'static str, reference: String },

    /// Duplicate transaction reference or competing settlement.
    Conflict(String),

    /// The requested transition is not valid from the current state.
    InvalidState { current: String, attempted: String },

    /// Callback signature verification failed.
    InvalidCallbackSignature,

    /// The payment provider reported a failure or sent an unusable payload.
    Gateway(String),

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, reference: impl Into<String>) -> Self {
        BillingError::NotFound {
            resource,
            reference: reference.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BillingError::Conflict(message.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn invalid_callback_signature() -> Self {
        BillingError::InvalidCallbackSignature
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        BillingError::Gateway(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::Validation { .. } => ErrorCode::ValidationFailed,
            BillingError::NotFound { resource, .. } => match *resource {
                "tenant" => ErrorCode::TenantNotFound,
                "subscription" => ErrorCode::SubscriptionNotFound,
                _ => ErrorCode::PaymentNotFound,
            },
            BillingError::Conflict(_) => ErrorCode::DuplicateTransaction,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::InvalidCallbackSignature => ErrorCode::Unauthorized,
            BillingError::Gateway(_) => ErrorCode::GatewayError,
            BillingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::Validation { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::NotFound { resource, reference } => {
                format!("No {} found for {}", resource, reference)
            }
            BillingError::Conflict(msg) => msg.clone(),
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} a subscription in {} state", attempted, current)
            }
            BillingError::InvalidCallbackSignature => {
                "Invalid callback signature".to_string()
            }
            BillingError::Gateway(msg) => format!("Payment gateway error: {}", msg),
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => BillingError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::TenantNotFound => BillingError::NotFound {
                resource: "tenant",
                reference: err.message,
            },
            ErrorCode::SubscriptionNotFound => BillingError::NotFound {
                resource: "subscription",
                reference: err.message,
            },
            ErrorCode::PaymentNotFound => BillingError::NotFound {
                resource: "payment",
                reference: err.message,
            },
            ErrorCode::SubscriptionExists
            | ErrorCode::DuplicateTransaction
            | ErrorCode::PaymentAlreadySettled => BillingError::Conflict(err.message),
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                current: err
                    .details
                    .get("current")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                attempted: err.message,
            },
            ErrorCode::GatewayError => BillingError::Gateway(err.message),
            _ => BillingError::Infrastructure(err.message),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
