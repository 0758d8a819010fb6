//! Path spec → negotiator table.
//!
//! # Responsibilities
//! - Reject a second negotiator for an already mapped path spec
//! - Store the merged configuration for each mapping
//! - Resolve request paths to one negotiator plus the match details
//!
//! # Design Decisions
//! - Populated during single-threaded setup and read-only afterwards, so
//!   `resolve` needs no synchronization
//! - Negotiators are `Arc`ed so a resolved entry outlives the borrow of the map

use std::fmt;
use std::sync::Arc;

use super::creator::WebSocketCreator;
use super::error::UpgradeError;
use crate::config::{ConfigOverrides, WebSocketConfig};
use crate::pathmap::{MatchedPath, PathMappings, PathSpec};

/// One registered mapping.
pub struct Negotiator {
    spec: PathSpec,
    creator: Arc<dyn WebSocketCreator>,
    config: WebSocketConfig,
}

impl Negotiator {
    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    pub fn creator(&self) -> &Arc<dyn WebSocketCreator> {
        &self.creator
    }

    /// Configuration merged at registration time.
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

impl fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiator")
            .field("spec", &self.spec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct NegotiatorMap {
    mappings: PathMappings<Arc<Negotiator>>,
}

impl NegotiatorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `creator` for `spec`.
    ///
    /// The stored configuration is `defaults` with `overrides` applied; it
    /// is a copy, so later edits to `defaults` do not reach this mapping.
    pub fn register(
        &mut self,
        spec: PathSpec,
        creator: Arc<dyn WebSocketCreator>,
        defaults: &WebSocketConfig,
        overrides: &ConfigOverrides,
    ) -> Result<(), UpgradeError> {
        let negotiator = Negotiator {
            spec: spec.clone(),
            creator,
            config: defaults.customized(overrides),
        };
        self.mappings.insert(spec, Arc::new(negotiator))?;
        Ok(())
    }

    pub fn resolve(&self, path: &str) -> Option<(Arc<Negotiator>, MatchedPath)> {
        self.mappings
            .resolve(path)
            .map(|(negotiator, matched)| (Arc::clone(negotiator), matched))
    }

    pub fn get(&self, spec: &PathSpec) -> Option<&Arc<Negotiator>> {
        self.mappings.get(spec)
    }

    /// Mappings in match priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Negotiator>> {
        self.mappings.iter().map(|(_, negotiator)| negotiator)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
