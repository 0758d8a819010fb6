//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the WebSocket server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, shutdown grace period).
    pub listener: ListenerConfig,

    /// Container-wide WebSocket defaults.
    pub websocket: WebSocketConfig,

    /// Path spec → endpoint mappings, each with optional overrides.
    pub mappings: Vec<MappingConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Seconds to wait for open sessions to drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            shutdown_grace_secs: 5,
        }
    }
}

/// Which side of the connection a configuration applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    #[default]
    Server,
    Client,
}

/// Per-session WebSocket policy.
///
/// Values are immutable once handed to a session; customization always
/// produces a new value via [`WebSocketConfig::customized`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Idle timeout in seconds (0 disables it).
    pub idle_timeout_secs: u64,

    /// Read buffer size in bytes.
    pub input_buffer_size: usize,

    /// Write buffer size in bytes.
    pub output_buffer_size: usize,

    /// Ceiling for a whole text message, in bytes of decoded text.
    pub max_text_message_size: usize,

    /// Ceiling for a whole binary message, in bytes.
    pub max_binary_message_size: usize,

    /// Ceiling for a single frame, in bytes.
    pub max_frame_size: usize,

    /// Split outgoing messages larger than `max_frame_size`.
    pub auto_fragment: bool,

    #[serde(skip)]
    pub behavior: Behavior,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30,
            input_buffer_size: 4096,
            output_buffer_size: 4096,
            max_text_message_size: 64 * 1024,
            max_binary_message_size: 64 * 1024,
            max_frame_size: 64 * 1024,
            auto_fragment: true,
            behavior: Behavior::Server,
        }
    }
}

impl WebSocketConfig {
    /// Idle timeout, `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Largest message of either kind.
    pub fn max_message_size(&self) -> usize {
        self.max_text_message_size.max(self.max_binary_message_size)
    }

    /// New value with every field set in `overrides` replaced.
    pub fn customized(&self, overrides: &ConfigOverrides) -> Self {
        Self {
            idle_timeout_secs: overrides.idle_timeout_secs.unwrap_or(self.idle_timeout_secs),
            input_buffer_size: overrides.input_buffer_size.unwrap_or(self.input_buffer_size),
            output_buffer_size: overrides.output_buffer_size.unwrap_or(self.output_buffer_size),
            max_text_message_size: overrides
                .max_text_message_size
                .unwrap_or(self.max_text_message_size),
            max_binary_message_size: overrides
                .max_binary_message_size
                .unwrap_or(self.max_binary_message_size),
            max_frame_size: overrides.max_frame_size.unwrap_or(self.max_frame_size),
            auto_fragment: overrides.auto_fragment.unwrap_or(self.auto_fragment),
            behavior: self.behavior,
        }
    }
}

/// Optional per-path deltas on top of the container defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConfigOverrides {
    pub idle_timeout_secs: Option<u64>,
    pub input_buffer_size: Option<usize>,
    pub output_buffer_size: Option<usize>,
    pub max_text_message_size: Option<usize>,
    pub max_binary_message_size: Option<usize>,
    pub max_frame_size: Option<usize>,
    pub auto_fragment: Option<bool>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn input_buffer_size(mut self, size: usize) -> Self {
        self.input_buffer_size = Some(size);
        self
    }

    pub fn output_buffer_size(mut self, size: usize) -> Self {
        self.output_buffer_size = Some(size);
        self
    }

    pub fn max_text_message_size(mut self, size: usize) -> Self {
        self.max_text_message_size = Some(size);
        self
    }

    pub fn max_binary_message_size(mut self, size: usize) -> Self {
        self.max_binary_message_size = Some(size);
        self
    }

    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = Some(size);
        self
    }

    pub fn auto_fragment(mut self, enabled: bool) -> Self {
        self.auto_fragment = Some(enabled);
        self
    }
}

/// A single path spec mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Path spec (e.g. "/chat/*", "/echo", "*.ws", "/rooms/{room}").
    pub path_spec: String,

    /// Name of the built-in endpoint to mount ("echo", "chat").
    pub endpoint: String,

    /// Overrides applied on top of `[websocket]`.
    #[serde(flatten)]
    pub overrides: ConfigOverrides,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
