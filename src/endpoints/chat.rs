//! Chat endpoint: text is broadcast to every session on the same path.
//!
//! Clients connecting to `/chat/lobby` share a room; `/chat/other` is a
//! different room under the same mapping.

use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;

use crate::session::{Endpoint, Session, SessionRegistry};
use crate::upgrade::{Completion, CreateResult, UpgradeRequest, UpgradeResponse, WebSocketCreator};

pub const CHAT_SUBPROTOCOL: &str = "chat";

/// Broadcasts text to the other members of a room.
///
/// Holds the registry weakly: sessions own their endpoint and the registry
/// owns the sessions.
#[derive(Debug)]
pub struct ChatRoom {
    registry: Weak<SessionRegistry>,
}

impl ChatRoom {
    pub fn new(registry: &Arc<SessionRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }

    fn members(&self, session: &Session) -> Vec<Arc<Session>> {
        let Some(registry) = self.registry.upgrade() else {
            return Vec::new();
        };
        registry
            .snapshot()
            .into_iter()
            .filter(|s| s.path() == session.path() && s.path_spec() == session.path_spec())
            .collect()
    }
}

impl Endpoint for ChatRoom {
    fn on_open(&self, session: &Arc<Session>) {
        tracing::debug!(
            session_id = %session.id(),
            room = %session.path(),
            members = self.members(session).len(),
            "Joined chat room"
        );
    }

    fn on_text(&self, session: &Arc<Session>, text: String) {
        let mut delivered = 0usize;
        for member in self.members(session) {
            if member.id() == session.id() {
                continue;
            }
            match member.send_text(text.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(session_id = %member.id(), error = %e, "Chat delivery failed"),
            }
        }
        tracing::trace!(session_id = %session.id(), delivered, "Chat message broadcast");
    }
}

/// Negotiates the `chat` subprotocol.
///
/// Clients that offer subprotocols but not `chat` are declined with 400.
/// Clients that offer none are accepted without a subprotocol.
#[derive(Debug)]
pub struct ChatCreator {
    registry: Weak<SessionRegistry>,
}

impl ChatCreator {
    pub fn new(registry: &Arc<SessionRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }

    async fn negotiate(&self, request: &UpgradeRequest, response: &mut UpgradeResponse) -> CreateResult {
        if !request.subprotocols().is_empty() {
            if !request.has_subprotocol(CHAT_SUBPROTOCOL) {
                response.send_error(400, "chat subprotocol required");
                return Ok(None);
            }
            response.set_accepted_subprotocol(CHAT_SUBPROTOCOL);
        }

        let registry = self.registry.upgrade().ok_or("session registry is gone")?;
        Ok(Some(Arc::new(ChatRoom::new(&registry))))
    }
}

impl WebSocketCreator for ChatCreator {
    fn create<'a>(
        &'a self,
        request: &'a UpgradeRequest,
        response: &'a mut UpgradeResponse,
        _completion: &'a Completion,
    ) -> BoxFuture<'a, CreateResult> {
        Box::pin(self.negotiate(request, response))
    }
}
