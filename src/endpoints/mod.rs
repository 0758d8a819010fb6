//! Built-in endpoints that can be mounted from configuration.
//!
//! # Data Flow
//! ```text
//! [[mappings]] endpoint = "echo" | "chat"
//!     → creator_for(name) (a WebSocketCreator)
//!     → container negotiates, endpoint handles the session's messages
//! ```

pub mod chat;
pub mod echo;

use std::sync::Arc;

use crate::session::SessionRegistry;
use crate::upgrade::WebSocketCreator;

pub use chat::{ChatCreator, ChatRoom, CHAT_SUBPROTOCOL};
pub use echo::{EchoCreator, EchoEndpoint};

/// Endpoint names accepted in `[[mappings]]`.
pub const KNOWN: &[&str] = &["echo", "chat"];

/// Creator for a named built-in endpoint.
pub fn creator_for(name: &str, registry: &Arc<SessionRegistry>) -> Option<Arc<dyn WebSocketCreator>> {
    match name {
        "echo" => Some(Arc::new(EchoCreator)),
        "chat" => Some(Arc::new(ChatCreator::new(registry))),
        _ => None,
    }
}
