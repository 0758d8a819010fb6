//! Incremental UTF-8 validation and decoding.
//!
//! # Data Flow
//! ```text
//! byte chunks (any size, split anywhere)
//!     → automaton.rs (byte class → state transition, code point accumulator)
//!     → decoder.rs (placeholder substitution, strict/lenient signalling)
//!     → sink.rs (caller-owned text buffer: String, UTF-16 units, ...)
//! ```
//!
//! # Design Decisions
//! - Table-driven DFA; the only carried state is the automaton index and
//!   the partial code point, raw bytes are never buffered
//! - A rejected byte is always consumed and replaced by U+FFFD, so the
//!   decoder can never get stuck
//! - Strict mode surfaces the failure after the placeholder is written;
//!   lenient mode keeps going silently

pub mod automaton;
pub mod decoder;
pub mod error;
pub mod sink;

pub use automaton::{DecoderState, Step};
pub use decoder::{DecodeEvent, Utf8Decoder, Utf8StringBuilder};
pub use error::Utf8Error;
pub use sink::Utf8Sink;

/// Character substituted for every malformed or truncated sequence.
pub const REPLACEMENT: char = '\u{FFFD}';

/// UTF-8 encoding of [`REPLACEMENT`].
pub const REPLACEMENT_UTF8: [u8; 3] = [0xEF, 0xBF, 0xBD];
