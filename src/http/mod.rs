//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → upgrade_handler: UpgradeRequest + Completion
//!     → WebSocketContainer::handle (resolve, negotiate)
//!     → WebSocketUpgrade configured from the session's config snapshot
//!     → websocket.rs (socket pump until close)
//! ```

pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
