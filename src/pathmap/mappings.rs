//! Ordered path spec → value table.
//!
//! # Responsibilities
//! - Store one value per distinct path spec
//! - Reject duplicate registrations
//! - Resolve a concrete path to the highest priority match
//!
//! # Design Decisions
//! - Built during single-threaded setup, then shared read-only
//! - Entries kept sorted by priority so resolve is a first-match scan

use thiserror::Error;

use super::spec::{MatchedPath, PathSpec};

/// A second registration for an already mapped spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate mapping for path spec {0}")]
pub struct DuplicatePathSpec(pub PathSpec);

/// Path specs mapped to values, resolved by match priority.
#[derive(Debug, Clone)]
pub struct PathMappings<T> {
    entries: Vec<(PathSpec, T)>,
}

impl<T> PathMappings<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Map `spec` to `value`. An existing mapping for the same spec is
    /// left in place and the call fails.
    pub fn insert(&mut self, spec: PathSpec, value: T) -> Result<(), DuplicatePathSpec> {
        if self.get(&spec).is_some() {
            return Err(DuplicatePathSpec(spec));
        }
        let at = self
            .entries
            .partition_point(|(existing, _)| existing.priority_cmp(&spec).is_lt());
        self.entries.insert(at, (spec, value));
        Ok(())
    }

    pub fn get(&self, spec: &PathSpec) -> Option<&T> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == spec)
            .map(|(_, value)| value)
    }

    /// Highest priority mapping matching `path`.
    pub fn resolve(&self, path: &str) -> Option<(&T, MatchedPath)> {
        self.entries
            .iter()
            .find_map(|(spec, value)| spec.matches(path).map(|m| (value, m)))
    }

    /// Entries in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathSpec, &T)> {
        self.entries.iter().map(|(spec, value)| (spec, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for PathMappings<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> PathSpec {
        PathSpec::parse(s).unwrap()
    }

    #[test]
    fn duplicate_rejected_and_first_kept() {
        let mut map = PathMappings::new();
        map.insert(spec("/chat/*"), "first").unwrap();
        let err = map.insert(spec("/chat/*"), "second").unwrap_err();

        assert_eq!(err, DuplicatePathSpec(spec("/chat/*")));
        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve("/chat/room1").map(|(v, _)| *v), Some("first"));
    }

    #[test]
    fn unmatched_path_resolves_to_none() {
        let mut map = PathMappings::new();
        map.insert(spec("/chat/*"), 1).unwrap();
        assert!(map.resolve("/other").is_none());
    }

    #[test]
    fn most_specific_wins_regardless_of_insert_order() {
        let mut map = PathMappings::new();
        map.insert(spec("/"), "default").unwrap();
        map.insert(spec("*.ws"), "suffix").unwrap();
        map.insert(spec("/*"), "root").unwrap();
        map.insert(spec("/chat/*"), "chat").unwrap();
        map.insert(spec("/chat/lobby"), "lobby").unwrap();

        let hit = |path: &str| map.resolve(path).map(|(v, _)| *v);
        assert_eq!(hit("/chat/lobby"), Some("lobby"));
        assert_eq!(hit("/chat/room1"), Some("chat"));
        assert_eq!(hit("/x/y.ws"), Some("root"));
        assert_eq!(hit("/chat/y.ws"), Some("chat"));
    }

    #[test]
    fn suffix_and_default_fallbacks() {
        let mut map = PathMappings::new();
        map.insert(spec("/"), "default").unwrap();
        map.insert(spec("*.ws"), "suffix").unwrap();

        let (value, matched) = map.resolve("/a/b.ws").unwrap();
        assert_eq!(*value, "suffix");
        assert_eq!(matched.spec, spec("*.ws"));
        assert_eq!(map.resolve("/a/b").map(|(v, _)| *v), Some("default"));
    }
}
