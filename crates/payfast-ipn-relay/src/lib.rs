//! PayFast IPN relay: receives payment notifications, verifies them with the
//! [`ipn`] crate, and forwards authentic ones to a CRM endpoint.
//!
//! # Modules
//!
//! - [`routes`] - HTTP endpoints (notify, health, metrics)
//! - [`config`] - [`RelayConfig`] read once from the environment
//! - [`relay`] - the outbound CRM call
//! - [`event_log`] - append-only line log of notifications and outcomes
//! - [`validation`] - source address allowlist
//! - [`metrics`] - Prometheus counters and relay latency

pub mod config;
pub mod error;
pub mod event_log;
pub mod metrics;
pub mod relay;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::RelayConfig;
pub use error::RelayError;
pub use state::AppState;
