//! Live session tracking.
//!
//! # Data Flow
//! ```text
//! upgrade engine (session established)
//!     → registry.rs on_open (insert into live set)
//!     → listener.rs fan-out (opened event, faults isolated per listener)
//!
//! transport task (socket pump)
//!     → text.rs (per-connection UTF-8 validation of text messages)
//!     → endpoint.rs callbacks (application logic)
//!     → registry.rs on_close (remove, closed event)
//! ```
//!
//! # Design Decisions
//! - The registry is the single source of truth for "is this session live"
//! - Live set is a sharded concurrent map; listener list is copy-on-write,
//!   so notification never blocks an unrelated open/close
//! - A misbehaving listener is logged and counted, never escalated

pub mod endpoint;
pub mod listener;
pub mod registry;
pub mod session;
pub mod text;

pub use endpoint::Endpoint;
pub use listener::{ListenerFault, SessionEvent, SessionListener};
pub use registry::SessionRegistry;
pub use session::{
    OutboundMessage, Session, SessionError, SessionId, SessionInfo, SessionState, OUTBOUND_QUEUE_CAPACITY,
};
pub use text::TextMessageAssembler;
