//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and gauges via `metrics`)
//!
//! Consumers:
//!     → stdout (human readable or JSON lines)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP layer into log spans
//! - Recording a metric without an installed recorder is a no-op, so the
//!   library core records unconditionally

pub mod logging;
pub mod metrics;
