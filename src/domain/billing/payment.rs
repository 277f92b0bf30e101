//! Payment ledger entry.
//!
//! A Payment records one attempt to charge a tenant: created PENDING at
//! checkout, settled to exactly one terminal status by the gateway callback
//! or the synchronous mock path. The provider transaction reference is unique
//! and doubles as the idempotency key against duplicate webhook delivery.
//!
//! Monetary amounts are `i64` minor currency units. Metadata is a tagged
//! variant keyed by payment type, so a malformed or partial payload cannot
//! pass validation the way an open JSON map would.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, StateMachine, TenantId, Timestamp, UserId,
};

/// What a payment is for. Spellings are part of the persisted contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentType {
    /// One-time activation fee for a tenant's first subscription period.
    #[serde(rename = "SETUP_FEE")]
    SetupFee,

    /// Recurring monthly charge.
    #[serde(rename = "MONTHLY_SUBSCRIPTION")]
    MonthlySubscription,
}

impl PaymentType {
    /// Contract spelling, used for persistence and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::SetupFee => "SETUP_FEE",
            PaymentType::MonthlySubscription => "MONTHLY_SUBSCRIPTION",
        }
    }
}

/// Payment settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    #[serde(rename = "FAILED")]
    Failed,
}

impl PaymentStatus {
    /// Contract spelling, used for persistence and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!((self, target), (Pending, Succeeded) | (Pending, Failed))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Succeeded, Failed],
            Succeeded | Failed => vec![],
        }
    }
}

/// Terminal outcome requested by a settlement caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failure,
}

/// Typed per-payment-type metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentMetadata {
    /// Setup-fee payload.
    #[serde(rename = "SETUP_FEE")]
    SetupFee {
        /// True when this payment restarts an EXPIRED subscription rather
        /// than activating a first one.
        reactivation: bool,
    },

    /// Monthly renewal payload.
    #[serde(rename = "MONTHLY_SUBSCRIPTION")]
    MonthlySubscription {
        /// Period end this renewal was issued against, when known at
        /// creation time. Settlement recomputes the real extension.
        extends_period_end: Option<Timestamp>,
    },
}

impl PaymentMetadata {
    /// Checks the variant agrees with the payment type.
    pub fn matches_type(&self, payment_type: PaymentType) -> bool {
        matches!(
            (self, payment_type),
            (PaymentMetadata::SetupFee { .. }, PaymentType::SetupFee)
                | (
                    PaymentMetadata::MonthlySubscription { .. },
                    PaymentType::MonthlySubscription
                )
        )
    }
}

/// Payment ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier for this payment.
    pub id: PaymentId,

    /// Tenant being charged.
    pub tenant_id: TenantId,

    /// Store owner who initiated the charge.
    pub user_id: UserId,

    /// What the payment is for.
    pub payment_type: PaymentType,

    /// Amount in minor currency units. Set from the configured price table,
    /// never from request input.
    pub amount: i64,

    /// Settlement status.
    pub status: PaymentStatus,

    /// Provider order reference. Unique; the idempotency key for callback
    /// delivery.
    pub transaction_id: String,

    /// Typed metadata matching `payment_type`.
    pub metadata: PaymentMetadata,

    /// When the payment was created.
    pub created_at: Timestamp,

    /// When the payment was last updated.
    pub updated_at: Timestamp,
}

impl Payment {
    /// Creates a PENDING payment.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the amount is not positive or the
    /// metadata variant does not match the payment type.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: PaymentId,
        tenant_id: TenantId,
        user_id: UserId,
        payment_type: PaymentType,
        amount: i64,
        transaction_id: String,
        metadata: PaymentMetadata,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        if amount <= 0 {
            return Err(DomainError::validation(
                "amount",
                format!("Payment amount must be positive, got {}", amount),
            ));
        }
        if transaction_id.trim().is_empty() {
            return Err(DomainError::validation(
                "transaction_id",
                "Transaction reference cannot be empty",
            ));
        }
        if !metadata.matches_type(payment_type) {
            return Err(DomainError::validation(
                "metadata",
                format!(
                    "Metadata variant does not match payment type {}",
                    payment_type.as_str()
                ),
            ));
        }
        Ok(Self {
            id,
            tenant_id,
            user_id,
            payment_type,
            amount,
            status: PaymentStatus::Pending,
            transaction_id,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// True once the payment has reached SUCCEEDED or FAILED.
    pub fn is_terminal(&self) -> bool {
        self.status != PaymentStatus::Pending
    }

    /// Marks the payment SUCCEEDED.
    pub fn succeed(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Succeeded)?;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the payment FAILED.
    pub fn fail(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(PaymentStatus::Failed)?;
        self.updated_at = now;
        Ok(())
    }

    /// Applies the requested outcome.
    pub fn settle(&mut self, outcome: PaymentOutcome, now: Timestamp) -> Result<(), DomainError> {
        match outcome {
            PaymentOutcome::Success => self.succeed(now),
            PaymentOutcome::Failure => self.fail(now),
        }
    }

    fn transition_to(&mut self, target: PaymentStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::PaymentAlreadySettled,
                format!(
                    "Payment {} is already {}",
                    self.id,
                    self.status.as_str()
                ),
            )
        })?;
        Ok(())
    }
}
