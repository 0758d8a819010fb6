//! Request/response views handed to creators.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::config::{ConfigOverrides, WebSocketConfig};
use crate::pathmap::{MatchedPath, PathSpec};
use crate::session::Session;

const SEC_WEBSOCKET_PROTOCOL: &str = "sec-websocket-protocol";

/// Read-only view of the upgrade request.
#[derive(Debug, Clone, Default)]
pub struct UpgradeRequest {
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    subprotocols: Vec<String>,
    matched: Option<MatchedPath>,
}

impl UpgradeRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn from_parts(uri: &Uri, headers: &HeaderMap) -> Self {
        let subprotocols = headers
            .get_all(SEC_WEBSOCKET_PROTOCOL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers: headers.clone(),
            subprotocols,
            matched: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_subprotocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subprotocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Subprotocols offered by the client, in preference order.
    pub fn subprotocols(&self) -> &[String] {
        &self.subprotocols
    }

    pub fn has_subprotocol(&self, protocol: &str) -> bool {
        self.subprotocols.iter().any(|p| p == protocol)
    }

    /// The mapping that matched this request, once resolved.
    pub fn matched(&self) -> Option<&MatchedPath> {
        self.matched.as_ref()
    }

    pub fn path_spec(&self) -> Option<&PathSpec> {
        self.matched.as_ref().map(|m| &m.spec)
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.matched.as_ref().and_then(|m| m.param(name))
    }

    pub(crate) fn set_matched(&mut self, matched: MatchedPath) {
        self.matched = Some(matched);
    }
}

/// Why a creator declined the upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub reason: String,
}

/// Mutable view of the upgrade response.
///
/// Holds this exchange's own copy of the session configuration; creators
/// may adjust it without touching the mapping or container defaults.
#[derive(Debug, Clone, Default)]
pub struct UpgradeResponse {
    config: WebSocketConfig,
    accepted_subprotocol: Option<String>,
    rejection: Option<Rejection>,
    headers: HeaderMap,
    session: Option<Arc<Session>>,
}

impl UpgradeResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut WebSocketConfig {
        &mut self.config
    }

    pub fn customize(&mut self, overrides: &ConfigOverrides) {
        self.config = self.config.customized(overrides);
    }

    pub(crate) fn set_config(&mut self, config: WebSocketConfig) {
        self.config = config;
    }

    pub fn set_accepted_subprotocol(&mut self, protocol: impl Into<String>) {
        self.accepted_subprotocol = Some(protocol.into());
    }

    pub fn accepted_subprotocol(&self) -> Option<&str> {
        self.accepted_subprotocol.as_deref()
    }

    /// Decline with an explicit status.
    pub fn send_error(&mut self, status: u16, reason: impl Into<String>) {
        self.rejection = Some(Rejection {
            status,
            reason: reason.into(),
        });
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The session established by this exchange, if any.
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn take_session(&mut self) -> Option<Arc<Session>> {
        self.session.take()
    }

    pub(crate) fn set_session(&mut self, session: Arc<Session>) {
        self.session = Some(session);
    }
}
