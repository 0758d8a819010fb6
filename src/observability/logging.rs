//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber once at startup
//! - Pick the filter from `RUST_LOG`, falling back to the configured level
//!
//! # Design Decisions
//! - JSON lines for production, pretty format for development
//! - A second initialisation (tests, embedding) is reported, not fatal

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.is_ok()
}

fn default_filter(config: &ObservabilityConfig) -> EnvFilter {
    let level = config.log_level.trim();
    EnvFilter::try_new(format!("wsgate={level},tower_http={level}"))
        .unwrap_or_else(|_| EnvFilter::new("wsgate=info,tower_http=info"))
}
