//! WebSocket upgrade negotiation.
//!
//! # Data Flow
//! ```text
//! Setup (single-threaded):
//!     container.rs builder → negotiator.rs register(path spec, creator, config)
//!     → freeze as WebSocketContainer (shared via Arc)
//!
//! Per request:
//!     Received ──resolve──▶ Resolved ──creator──▶ Negotiating
//!         │ no mapping                              ├─ endpoint   → Established (registry.on_open)
//!         ▼                                         ├─ none       → Rejected (declined)
//!     not handled                                   └─ error/panic→ Failed
//!
//!     completion.rs fires exactly once for every handled exchange
//! ```
//!
//! # Design Decisions
//! - Creator faults (errors and panics) stop at the engine boundary and are
//!   reported through the completion, never to the transport
//! - Each mapping stores a merged config copy; every negotiation hands the
//!   creator its own copy again, so nothing aliases container defaults
//! - Dropping a pending negotiation fails its completion instead of leaking it

pub mod completion;
pub mod container;
pub mod creator;
pub mod error;
pub mod negotiator;
pub mod request;

pub use completion::{Completion, CompletionOutcome};
pub use container::{WebSocketContainer, WebSocketContainerBuilder};
pub use creator::{creator_fn, CreateResult, WebSocketCreator};
pub use error::{CompletionError, NegotiationError, UpgradeError};
pub use negotiator::{Negotiator, NegotiatorMap};
pub use request::{Rejection, UpgradeRequest, UpgradeResponse};
