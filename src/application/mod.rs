//! Application layer - use-case handlers bridging HTTP to the domain
//! services.

pub mod handlers;
