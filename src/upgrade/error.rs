//! Upgrade and negotiation errors.

use thiserror::Error;

use crate::pathmap::{DuplicatePathSpec, PathSpec, PathSpecError};
use crate::BoxError;

/// Setup-time mapping errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    #[error("Duplicate WebSocket mapping for path spec {0}")]
    DuplicateMapping(PathSpec),

    #[error("Invalid path spec: {0}")]
    InvalidPathSpec(#[from] PathSpecError),
}

impl From<DuplicatePathSpec> for UpgradeError {
    fn from(err: DuplicatePathSpec) -> Self {
        Self::DuplicateMapping(err.0)
    }
}

/// Why an exchange completed as failed.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("WebSocket creator failed: {0}")]
    Creator(#[source] BoxError),

    #[error("WebSocket creator panicked: {0}")]
    Panicked(String),

    #[error("negotiation cancelled before completion")]
    Cancelled,
}

/// Misuse of a [`Completion`](super::Completion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("exchange already completed")]
    AlreadyCompleted,
}
