//! Payment repository port.
//!
//! The ledger's persistence contract. Two constraints carry the idempotency
//! story:
//!
//! - `transaction_id` is unique, so a duplicate provider reference can never
//!   create a second ledger entry;
//! - the terminal write is conditional on the row still being PENDING, so
//!   concurrent or redelivered settlements collapse to one effect.

use async_trait::async_trait;

use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, PaymentId};

/// Result of a conditional settlement write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleWrite {
    /// The row was PENDING and has been updated.
    Applied,
    /// The row already carried a terminal status; nothing was written.
    AlreadySettled,
}

/// Repository port for Payment ledger entries.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new PENDING payment.
    ///
    /// # Errors
    ///
    /// - `DuplicateTransaction` if the transaction reference already exists
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    /// Find a payment by its ID.
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Find a payment by its provider transaction reference.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Write a terminal status, only if the stored row is still PENDING.
    ///
    /// `payment` carries the desired terminal state. Implementations must
    /// guard with a conditional update (`WHERE status = 'PENDING'`) and
    /// report [`SettleWrite::AlreadySettled`] when the guard fails.
    async fn settle(&self, payment: &Payment) -> Result<SettleWrite, DomainError>;
}
