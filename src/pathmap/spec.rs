//! Path spec grammar.
//!
//! | Declaration      | Kind          | Matches                           |
//! |------------------|---------------|-----------------------------------|
//! | `/echo`          | exact         | `/echo` only                      |
//! | `/rooms/{room}`  | uri-template  | `/rooms/lobby` (room = "lobby")   |
//! | `/chat/*`        | prefix        | `/chat`, `/chat/`, `/chat/a/b`    |
//! | `/*`             | prefix        | everything                        |
//! | `*.ws`           | suffix        | `/any/where/socket.ws`            |
//! | `/`              | default       | everything, lowest priority       |

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Invalid path spec declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathSpecError {
    #[error("empty path spec")]
    Empty,

    #[error("path spec {0:?} must start with '/' or '*.'")]
    BadStart(String),

    #[error("path spec {0:?} has a '*' outside a trailing '/*' or leading '*.'")]
    MisplacedWildcard(String),

    #[error("path spec {0:?} has a malformed template variable")]
    BadTemplate(String),
}

/// Match priority group, lowest value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSpecGroup {
    Exact,
    UriTemplate,
    PrefixGlob,
    SuffixGlob,
    Default,
}

/// One `/`-separated piece of a uri-template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed path spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSpec {
    Exact(String),
    /// Base path without the trailing `/*` (empty for `/*`).
    Prefix(String),
    /// Extension without the leading `*.`.
    Suffix(String),
    UriTemplate {
        declaration: String,
        segments: Vec<Segment>,
    },
    Default,
}

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedPath {
    /// The spec that fired.
    pub spec: PathSpec,
    /// The full request path.
    pub path: String,
    /// The part of the path covered by the spec.
    pub path_match: String,
    /// Remainder after a prefix match (`/room1` for `/chat/*`).
    pub path_info: Option<String>,
    /// Values bound by a uri-template.
    pub params: BTreeMap<String, String>,
}

impl MatchedPath {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl PathSpec {
    pub fn parse(declaration: &str) -> Result<Self, PathSpecError> {
        let raw = declaration.strip_prefix("uri-template|").unwrap_or(declaration);
        if raw.is_empty() {
            return Err(PathSpecError::Empty);
        }
        if raw.contains('{') || raw.contains('}') {
            return Self::parse_template(raw);
        }
        if raw == "/" {
            return Ok(Self::Default);
        }
        if let Some(ext) = raw.strip_prefix("*.") {
            if ext.is_empty() || ext.contains('/') || ext.contains('*') {
                return Err(PathSpecError::MisplacedWildcard(raw.to_string()));
            }
            return Ok(Self::Suffix(ext.to_string()));
        }
        if !raw.starts_with('/') {
            return Err(PathSpecError::BadStart(raw.to_string()));
        }
        if let Some(base) = raw.strip_suffix("/*") {
            if base.contains('*') {
                return Err(PathSpecError::MisplacedWildcard(raw.to_string()));
            }
            return Ok(Self::Prefix(base.to_string()));
        }
        if raw.contains('*') {
            return Err(PathSpecError::MisplacedWildcard(raw.to_string()));
        }
        Ok(Self::Exact(raw.to_string()))
    }

    fn parse_template(raw: &str) -> Result<Self, PathSpecError> {
        let bad = || PathSpecError::BadTemplate(raw.to_string());
        if !raw.starts_with('/') {
            return Err(PathSpecError::BadStart(raw.to_string()));
        }
        let mut segments = Vec::new();
        for part in raw[1..].split('/') {
            if let Some(inner) = part.strip_prefix('{') {
                let name = inner.strip_suffix('}').ok_or_else(bad)?;
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(bad());
                }
                if segments.contains(&Segment::Variable(name.to_string())) {
                    return Err(bad());
                }
                segments.push(Segment::Variable(name.to_string()));
            } else if part.contains(['{', '}', '*']) {
                return Err(bad());
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }
        Ok(Self::UriTemplate {
            declaration: raw.to_string(),
            segments,
        })
    }

    pub fn group(&self) -> PathSpecGroup {
        match self {
            Self::Exact(_) => PathSpecGroup::Exact,
            Self::UriTemplate { .. } => PathSpecGroup::UriTemplate,
            Self::Prefix(_) => PathSpecGroup::PrefixGlob,
            Self::Suffix(_) => PathSpecGroup::SuffixGlob,
            Self::Default => PathSpecGroup::Default,
        }
    }

    /// Ordering used to pick among several matching specs.
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        self.group()
            .cmp(&other.group())
            .then_with(|| other.specificity().cmp(&self.specificity()))
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }

    fn specificity(&self) -> usize {
        match self {
            Self::Exact(path) | Self::Prefix(path) | Self::Suffix(path) => path.len(),
            Self::UriTemplate { segments, .. } => segments
                .iter()
                .filter(|s| matches!(s, Segment::Literal(_)))
                .count(),
            Self::Default => 0,
        }
    }

    pub fn matches(&self, path: &str) -> Option<MatchedPath> {
        let matched = |path_match: &str, path_info: Option<&str>, params| MatchedPath {
            spec: self.clone(),
            path: path.to_string(),
            path_match: path_match.to_string(),
            path_info: path_info.map(str::to_string),
            params,
        };

        match self {
            Self::Exact(exact) => (path == exact.as_str()).then(|| matched(path, None, BTreeMap::new())),
            Self::Prefix(base) => {
                let rest = path.strip_prefix(base.as_str())?;
                if rest.is_empty() {
                    Some(matched(base.as_str(), None, BTreeMap::new()))
                } else if rest.starts_with('/') {
                    Some(matched(base.as_str(), Some(rest), BTreeMap::new()))
                } else {
                    None
                }
            }
            Self::Suffix(ext) => {
                let last = path.rsplit('/').next()?;
                last.strip_suffix(ext.as_str())
                    .is_some_and(|stem| stem.ends_with('.'))
                    .then(|| matched(path, None, BTreeMap::new()))
            }
            Self::UriTemplate { segments, .. } => {
                let parts: Vec<&str> = path.strip_prefix('/')?.split('/').collect();
                if parts.len() != segments.len() {
                    return None;
                }
                let mut params = BTreeMap::new();
                for (segment, part) in segments.iter().zip(parts) {
                    match segment {
                        Segment::Literal(lit) if lit == part => {}
                        Segment::Literal(_) => return None,
                        Segment::Variable(_) if part.is_empty() => return None,
                        Segment::Variable(name) => {
                            params.insert(name.clone(), part.to_string());
                        }
                    }
                }
                Some(matched(path, None, params))
            }
            Self::Default => Some(matched(path, None, BTreeMap::new())),
        }
    }
}

impl FromStr for PathSpec {
    type Err = PathSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => f.write_str(path),
            Self::Prefix(base) => write!(f, "{base}/*"),
            Self::Suffix(ext) => write!(f, "*.{ext}"),
            Self::UriTemplate { declaration, .. } => f.write_str(declaration),
            Self::Default => f.write_str("/"),
        }
    }
}

impl Serialize for PathSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
