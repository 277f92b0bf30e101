//! Audit sink adapters.

mod in_memory;
mod tracing_audit;

pub use in_memory::InMemoryEventBus;
pub use tracing_audit::TracingAuditLog;
