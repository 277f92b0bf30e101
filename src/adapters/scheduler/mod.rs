//! Background job adapters.

mod reconciliation;

pub use reconciliation::{
    ReconciliationConfig, ReconciliationReport, ReconciliationScheduler, SweepError, SweepOutcome,
};
