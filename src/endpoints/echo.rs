//! Echo endpoint: every message goes straight back to its sender.

use std::sync::Arc;

use axum::body::Bytes;
use futures_util::future::BoxFuture;

use crate::session::{Endpoint, Session};
use crate::upgrade::{Completion, CreateResult, UpgradeRequest, UpgradeResponse, WebSocketCreator};

#[derive(Debug, Default)]
pub struct EchoEndpoint;

impl Endpoint for EchoEndpoint {
    fn on_text(&self, session: &Arc<Session>, text: String) {
        if let Err(e) = session.send_text(text) {
            tracing::debug!(session_id = %session.id(), error = %e, "Echo failed");
        }
    }

    fn on_binary(&self, session: &Arc<Session>, data: Bytes) {
        if let Err(e) = session.send_binary(data) {
            tracing::debug!(session_id = %session.id(), error = %e, "Echo failed");
        }
    }
}

/// Accepts every upgrade, echoing back the first offered subprotocol.
#[derive(Debug, Default)]
pub struct EchoCreator;

impl EchoCreator {
    async fn negotiate(&self, request: &UpgradeRequest, response: &mut UpgradeResponse) -> CreateResult {
        if let Some(protocol) = request.subprotocols().first() {
            response.set_accepted_subprotocol(protocol.clone());
        }
        Ok(Some(Arc::new(EchoEndpoint)))
    }
}

impl WebSocketCreator for EchoCreator {
    fn create<'a>(
        &'a self,
        request: &'a UpgradeRequest,
        response: &'a mut UpgradeResponse,
        _completion: &'a Completion,
    ) -> BoxFuture<'a, CreateResult> {
        Box::pin(self.negotiate(request, response))
    }
}
