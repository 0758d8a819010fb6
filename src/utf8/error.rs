//! UTF-8 decode failures.

use thiserror::Error;

/// A malformed or truncated UTF-8 sequence.
///
/// By the time one of these is produced the offending sequence has already
/// been replaced by [`REPLACEMENT`](super::REPLACEMENT) in the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Utf8Error {
    /// A byte that cannot start or continue a sequence.
    #[error("Not valid UTF8! byte 0x{byte:02X} at offset {offset} in state {state}")]
    InvalidByte { byte: u8, offset: u64, state: u8 },

    /// Input ended (or a frame boundary was reached) mid-sequence.
    #[error("Not valid UTF8! incomplete UTF8 sequence at offset {offset} in state {state}")]
    IncompleteSequence { offset: u64, state: u8 },

    /// A whole character was appended while a sequence was pending.
    #[error("Not valid UTF8! char appended in state {state}")]
    InterruptedSequence { state: u8 },
}

impl Utf8Error {
    /// Automaton row at the time of failure.
    pub fn state(&self) -> u8 {
        match self {
            Self::InvalidByte { state, .. }
            | Self::IncompleteSequence { state, .. }
            | Self::InterruptedSequence { state } => *state,
        }
    }
}
