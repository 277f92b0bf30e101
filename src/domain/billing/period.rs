//! Billing period arithmetic.
//!
//! Pure date calculations for monthly billing periods. A period always spans
//! one calendar month: the next billing date is the start plus one month with
//! the day-of-month clamped to the target month's length, and the period ends
//! the day before the next billing date.

use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Adds `n` calendar months, clamping the day-of-month to the last valid day
/// of the target month (Jan 31 + 1 month = Feb 28, or Feb 29 in a leap year).
pub fn add_safe_months(ts: Timestamp, months: u32) -> Timestamp {
    let dt = ts
        .as_datetime()
        .checked_add_months(Months::new(months))
        .expect("billing date out of representable range");
    Timestamp::from_datetime(dt)
}

/// One billing period: start, inclusive end, and the date the next charge
/// falls due.
///
/// Invariant: `period_end == next_billing_date - 1 day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub next_billing_date: Timestamp,
}

impl BillingPeriod {
    /// Computes the period that begins at `start`.
    pub fn starting_at(start: Timestamp) -> Self {
        let next_billing_date = add_safe_months(start, 1);
        Self {
            period_start: start,
            period_end: next_billing_date.minus_days(1),
            next_billing_date,
        }
    }
}
