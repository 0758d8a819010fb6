//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build container (mappings, listeners) → Bind listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close open sessions → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then container, then listeners
//! - Ordered shutdown: stop accept, close sessions, drain
//! - Shutdown has a grace period: forced exit after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_container, StartupError};
