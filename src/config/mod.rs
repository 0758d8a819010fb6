//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → lifecycle::startup builds the container from it
//!
//! Per mapping:
//!     [websocket] defaults + mapping overrides
//!     → WebSocketConfig::customized (new value)
//!     → stored on the negotiator, copied again per session
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, Behavior, ConfigOverrides, ListenerConfig, MappingConfig, ObservabilityConfig,
    ServerConfig, WebSocketConfig,
};
pub use validation::{validate_config, ValidationError};
