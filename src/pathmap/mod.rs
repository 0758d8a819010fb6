//! Path spec matching.
//!
//! # Data Flow
//! ```text
//! Registration (single-threaded, before serving):
//!     "/chat/*" → spec.rs (parse into PathSpec)
//!     → mappings.rs (reject duplicates, keep entries in match order)
//!
//! Request time (read-only, shared):
//!     "/chat/room1" → mappings.rs (first entry in order that matches)
//!     → MatchedPath (spec + bound values) or None
//! ```
//!
//! # Design Decisions
//! - Match order: exact, uri-template, prefix (longest first), suffix, default
//! - No regex: every match is a string comparison or a segment walk
//! - Unmatched paths are a normal outcome, not an error

pub mod mappings;
pub mod spec;

pub use mappings::{DuplicatePathSpec, PathMappings};
pub use spec::{MatchedPath, PathSpec, PathSpecError, PathSpecGroup, Segment};
