//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every mapping names a known endpoint and a parsable path spec
//! - Validate value ranges (buffer sizes > 0, frame ≤ message ceilings)
//! - Detect duplicate path specs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{ServerConfig, WebSocketConfig};
use crate::endpoints;
use crate::pathmap::{PathSpec, PathSpecError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mapping {index}: invalid path spec {spec:?}: {source}")]
    InvalidPathSpec {
        index: usize,
        spec: String,
        source: PathSpecError,
    },

    #[error("mapping {index}: duplicate path spec {spec}")]
    DuplicatePathSpec { index: usize, spec: PathSpec },

    #[error("mapping {index}: unknown endpoint {endpoint:?}")]
    UnknownEndpoint { index: usize, endpoint: String },

    #[error("{scope}: {field} must be greater than zero")]
    ZeroSize { scope: String, field: &'static str },

    #[error("{scope}: max_frame_size ({frame}) exceeds max message size ({message})")]
    FrameExceedsMessage {
        scope: String,
        frame: usize,
        message: usize,
    },

    #[error("admin: api_key must be set when the admin API is enabled")]
    MissingAdminKey,

    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_sizes(&mut errors, "websocket", &config.websocket);

    let mut seen = HashSet::new();
    for (index, mapping) in config.mappings.iter().enumerate() {
        match PathSpec::parse(&mapping.path_spec) {
            Ok(spec) => {
                if !seen.insert(spec.clone()) {
                    errors.push(ValidationError::DuplicatePathSpec { index, spec });
                }
            }
            Err(source) => errors.push(ValidationError::InvalidPathSpec {
                index,
                spec: mapping.path_spec.clone(),
                source,
            }),
        }

        if !endpoints::KNOWN.contains(&mapping.endpoint.as_str()) {
            errors.push(ValidationError::UnknownEndpoint {
                index,
                endpoint: mapping.endpoint.clone(),
            });
        }

        let merged = config.websocket.customized(&mapping.overrides);
        if merged != config.websocket {
            check_sizes(&mut errors, &format!("mapping {index}"), &merged);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_sizes(errors: &mut Vec<ValidationError>, scope: &str, config: &WebSocketConfig) {
    let sizes = [
        ("input_buffer_size", config.input_buffer_size),
        ("output_buffer_size", config.output_buffer_size),
        ("max_text_message_size", config.max_text_message_size),
        ("max_binary_message_size", config.max_binary_message_size),
        ("max_frame_size", config.max_frame_size),
    ];
    for (field, value) in sizes {
        if value == 0 {
            errors.push(ValidationError::ZeroSize {
                scope: scope.to_string(),
                field,
            });
        }
    }

    let message = config.max_message_size();
    if config.max_frame_size > message {
        errors.push(ValidationError::FrameExceedsMessage {
            scope: scope.to_string(),
            frame: config.max_frame_size,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ConfigOverrides, MappingConfig};

    fn mapping(spec: &str, endpoint: &str) -> MappingConfig {
        MappingConfig {
            path_spec: spec.to_string(),
            endpoint: endpoint.to_string(),
            overrides: ConfigOverrides::default(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn duplicate_specs_are_rejected() {
        let config = ServerConfig {
            mappings: vec![mapping("/chat/*", "chat"), mapping("/chat/*", "echo")],
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicatePathSpec {
                index: 1,
                spec: PathSpec::parse("/chat/*").unwrap(),
            }]
        );
    }

    #[test]
    fn mapping_overrides_are_range_checked() {
        let mut bad = mapping("/echo", "echo");
        bad.overrides = ConfigOverrides::new().max_text_message_size(0).max_binary_message_size(10);
        let config = ServerConfig {
            mappings: vec![bad],
            ..Default::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroSize {
            scope: "mapping 0".to_string(),
            field: "max_text_message_size",
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::FrameExceedsMessage { message: 10, .. })));
    }

    #[test]
    fn admin_requires_key() {
        let mut config = ServerConfig::default();
        config.admin.enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MissingAdminKey]
        );
    }
}
