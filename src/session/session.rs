//! A single accepted WebSocket session.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::endpoint::Endpoint;
use crate::config::WebSocketConfig;
use crate::pathmap::{MatchedPath, PathSpec};
use crate::utf8::Utf8Error;

/// Messages a session may have queued for its writer before sends fail.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws-{}", self.0)
    }
}

/// Accepts both the displayed `ws-` form and a bare UUID.
impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("ws-").unwrap_or(s);
        Uuid::parse_str(raw).map(Self)
    }
}

/// Lifecycle state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Negotiated, not yet registered.
    Created = 0,
    Open = 1,
    Closed = 2,
}

impl From<u8> for SessionState {
    fn from(val: u8) -> Self {
        match val {
            1 => SessionState::Open,
            2 => SessionState::Closed,
            _ => SessionState::Created,
        }
    }
}

/// Errors surfaced on an individual session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,

    #[error("message exceeds the {limit} byte limit")]
    MessageTooLarge { limit: usize },

    #[error(transparent)]
    InvalidText(#[from] Utf8Error),

    #[error("idle for longer than {0} seconds")]
    IdleTimeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("outbound queue full ({capacity} messages)")]
    QueueFull { capacity: usize },

    #[error("endpoint panicked: {0}")]
    EndpointPanicked(String),
}

/// A message queued for the connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text(String),
    Binary(Bytes),
}

/// One live bidirectional connection.
///
/// Carries an immutable configuration snapshot taken at negotiation time.
pub struct Session {
    id: SessionId,
    matched: MatchedPath,
    config: WebSocketConfig,
    subprotocol: Option<String>,
    endpoint: Arc<dyn Endpoint>,
    state: AtomicU8,
    opened_at: Instant,
    opened_unix: u64,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: Mutex<Option<mpsc::Receiver<OutboundMessage>>>,
    close_tx: watch::Sender<bool>,
}

impl Session {
    pub fn new(
        matched: MatchedPath,
        config: WebSocketConfig,
        subprotocol: Option<String>,
        endpoint: Arc<dyn Endpoint>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (close_tx, _) = watch::channel(false);
        Self {
            id: SessionId::new(),
            matched,
            config,
            subprotocol,
            endpoint,
            state: AtomicU8::new(SessionState::Created as u8),
            opened_at: Instant::now(),
            opened_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            close_tx,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.matched.path
    }

    pub fn path_spec(&self) -> &PathSpec {
        &self.matched.spec
    }

    pub fn matched(&self) -> &MatchedPath {
        &self.matched
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    pub fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }

    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    pub(crate) fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Created as u8,
                SessionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Returns true on the first transition to closed.
    pub(crate) fn mark_closed(&self) -> bool {
        self.state.swap(SessionState::Closed as u8, Ordering::AcqRel) != SessionState::Closed as u8
    }

    /// Queue a text message for the peer.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        let limit = self.outbound_limit(self.config.max_text_message_size);
        if text.len() > limit {
            return Err(SessionError::MessageTooLarge { limit });
        }
        self.send(OutboundMessage::Text(text))
    }

    /// Queue a binary message for the peer.
    pub fn send_binary(&self, data: impl Into<Bytes>) -> Result<(), SessionError> {
        let data = data.into();
        let limit = self.outbound_limit(self.config.max_binary_message_size);
        if data.len() > limit {
            return Err(SessionError::MessageTooLarge { limit });
        }
        self.send(OutboundMessage::Binary(data))
    }

    /// Without auto-fragmentation a message must fit in a single frame.
    fn outbound_limit(&self, message_limit: usize) -> usize {
        if self.config.auto_fragment {
            message_limit
        } else {
            message_limit.min(self.config.max_frame_size)
        }
    }

    fn send(&self, message: OutboundMessage) -> Result<(), SessionError> {
        if self.state() == SessionState::Closed {
            return Err(SessionError::Closed);
        }
        self.outbound_tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                tracing::warn!(session_id = %self.id, "Outbound queue full, dropping message");
                SessionError::QueueFull {
                    capacity: OUTBOUND_QUEUE_CAPACITY,
                }
            }
            mpsc::error::TrySendError::Closed(_) => SessionError::Closed,
        })
    }

    /// Hand the outbound queue to the connection writer. Only the first
    /// caller gets it.
    pub fn take_outbound(&self) -> Option<mpsc::Receiver<OutboundMessage>> {
        self.outbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Ask the connection task to close the socket.
    pub fn request_close(&self) {
        self.close_tx.send_replace(true);
    }

    /// Resolves once [`request_close`](Self::request_close) was called.
    pub fn close_requested(&self) -> watch::Receiver<bool> {
        self.close_tx.subscribe()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            path: self.matched.path.clone(),
            path_spec: self.matched.spec.to_string(),
            subprotocol: self.subprotocol.clone(),
            state: self.state(),
            opened_at_unix: self.opened_unix,
            open_for_secs: self.opened_at.elapsed().as_secs(),
            config: self.config.clone(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("path", &self.matched.path)
            .field("path_spec", &self.matched.spec)
            .field("subprotocol", &self.subprotocol)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Serializable view of a session for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub path: String,
    pub path_spec: String,
    pub subprotocol: Option<String>,
    pub state: SessionState,
    pub opened_at_unix: u64,
    pub open_for_secs: u64,
    pub config: WebSocketConfig,
}
