//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (upgrades, open sessions, faults)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `wsgate_upgrades_total` (counter): upgrade outcomes by `outcome`
//!   (established, declined, failed)
//! - `wsgate_open_sessions` (gauge): sessions currently registered
//! - `wsgate_listener_faults_total` (counter): listener faults by `event`
//! - `wsgate_utf8_errors_total` (counter): rejected text frames
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations behind the facade)
//! - Outcome and event labels are `&'static str`, so cardinality is fixed

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const UPGRADES_TOTAL: &str = "wsgate_upgrades_total";
pub const OPEN_SESSIONS: &str = "wsgate_open_sessions";
pub const LISTENER_FAULTS_TOTAL: &str = "wsgate_listener_faults_total";
pub const UTF8_ERRORS_TOTAL: &str = "wsgate_utf8_errors_total";

/// Install the global recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

pub fn record_upgrade(outcome: &'static str) {
    metrics::counter!(UPGRADES_TOTAL, "outcome" => outcome).increment(1);
}

pub fn set_open_sessions(count: usize) {
    metrics::gauge!(OPEN_SESSIONS).set(count as f64);
}

pub fn record_listener_fault(event: &'static str) {
    metrics::counter!(LISTENER_FAULTS_TOTAL, "event" => event).increment(1);
}

pub fn record_utf8_error() {
    metrics::counter!(UTF8_ERRORS_TOTAL).increment(1);
}
