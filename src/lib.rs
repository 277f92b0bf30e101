//! StoreForge - multi-tenant storefront platform, billing core.
//!
//! This crate implements the subscription lifecycle that decides when a
//! tenant's storefront is allowed to serve traffic: payment ledger, gateway
//! callback ingestion, per-request access gating, and the reconciliation job
//! that ages subscriptions through grace into expiry.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
