//! Application-side WebSocket endpoint.

use std::sync::Arc;

use axum::body::Bytes;

use super::session::{Session, SessionError};

/// Callbacks for one accepted connection.
///
/// Invoked from the connection's own task, never concurrently for the
/// same session. Replies go through [`Session::send_text`] and friends.
pub trait Endpoint: Send + Sync + 'static {
    fn on_open(&self, _session: &Arc<Session>) {}

    fn on_text(&self, _session: &Arc<Session>, _text: String) {}

    fn on_binary(&self, _session: &Arc<Session>, _data: Bytes) {}

    fn on_error(&self, _session: &Arc<Session>, _error: &SessionError) {}

    fn on_close(&self, _session: &Arc<Session>) {}
}
