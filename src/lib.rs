//! wsgate: a WebSocket server built on Tokio and Axum.
//!
//! The library core is transport-independent: a streaming UTF-8 decoder,
//! a path spec table, the upgrade engine and the session registry. The
//! `http` module binds that core to Axum.

// Core
pub mod pathmap;
pub mod session;
pub mod upgrade;
pub mod utf8;

// Server
pub mod admin;
pub mod config;
pub mod endpoints;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

/// Error type for application supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use session::{Endpoint, Session, SessionListener, SessionRegistry};
pub use upgrade::{Completion, WebSocketContainer, WebSocketCreator};
pub use utf8::{Utf8Decoder, Utf8StringBuilder};
