//! Billing configuration

use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::billing::BillingPrices;

use super::error::ValidationError;

/// Billing configuration: the price table, grace window, and callback
/// verification secret.
#[derive(Debug, Deserialize)]
pub struct BillingConfig {
    /// One-time setup fee, minor currency units (tetri)
    #[serde(default = "default_setup_fee")]
    pub setup_fee_amount: i64,

    /// Monthly subscription fee, minor currency units (tetri)
    #[serde(default = "default_monthly_fee")]
    pub monthly_fee_amount: i64,

    /// Days a lapsed subscription stays reachable before expiry
    #[serde(default = "default_grace_days")]
    pub grace_period_days: u32,

    /// Shared secret for callback HMAC verification. Absent = verification
    /// disabled (no-op verifier).
    pub callback_secret: Option<SecretString>,
}

impl BillingConfig {
    /// The fixed price table handed to the payment ledger.
    pub fn prices(&self) -> BillingPrices {
        BillingPrices {
            setup_fee: self.setup_fee_amount,
            monthly_subscription: self.monthly_fee_amount,
        }
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.setup_fee_amount <= 0 || self.monthly_fee_amount <= 0 {
            return Err(ValidationError::InvalidBillingAmount);
        }
        if self.grace_period_days == 0 || self.grace_period_days > 90 {
            return Err(ValidationError::InvalidGracePeriod);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            setup_fee_amount: default_setup_fee(),
            monthly_fee_amount: default_monthly_fee(),
            grace_period_days: default_grace_days(),
            callback_secret: None,
        }
    }
}

fn default_setup_fee() -> i64 {
    10_000
}

fn default_monthly_fee() -> i64 {
    5_000
}

fn default_grace_days() -> u32 {
    7
}
