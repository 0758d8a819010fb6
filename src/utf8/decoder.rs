//! Streaming UTF-8 decoder over an arbitrary text sink.

use super::automaton::{DecoderState, Step};
use super::error::Utf8Error;
use super::sink::Utf8Sink;
use super::REPLACEMENT;

/// What a single byte produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A scalar value was appended to the sink.
    Emit(char),
    /// Part of a multi-byte sequence; nothing appended yet.
    NeedMoreBytes,
    /// The byte was rejected and a placeholder appended (lenient mode only;
    /// strict mode returns the error instead).
    Invalid(Utf8Error),
    /// A stray continuation byte directly after a rejected byte. It shares
    /// the placeholder already appended (lenient mode only).
    Folded(Utf8Error),
}

/// Decoder writing into a plain `String`.
pub type Utf8StringBuilder = Utf8Decoder<String>;

/// Incremental UTF-8 decoder.
///
/// Bytes may arrive in any chunking; the decoder carries only the automaton
/// state between calls. Every malformed sequence becomes one
/// [`REPLACEMENT`] in the sink. In strict mode (the default) the failure is
/// additionally returned to the caller, after the placeholder was written.
/// In lenient mode continuation bytes trailing a rejected byte fold into
/// its placeholder, so `[C0 80]` yields a single one.
#[derive(Debug, Clone)]
pub struct Utf8Decoder<S> {
    sink: S,
    state: DecoderState,
    strict: bool,
    offset: u64,
    replacing: bool,
}

impl<S: Utf8Sink> Utf8Decoder<S> {
    /// Strict decoder: malformed input is reported as an error.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: DecoderState::new(),
            strict: true,
            offset: 0,
            replacing: false,
        }
    }

    /// Lenient decoder: malformed input is silently replaced.
    pub fn lenient(sink: S) -> Self {
        Self {
            strict: false,
            ..Self::new(sink)
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Current automaton state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Bytes consumed since construction or the last [`reset`](Self::reset).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Number of output units currently held by the sink.
    pub fn len(&self) -> usize {
        self.sink.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sink.is_empty()
    }

    /// Feed one byte.
    pub fn decode_byte(&mut self, byte: u8) -> Result<DecodeEvent, Utf8Error> {
        let offset = self.offset;
        self.offset += 1;

        if self.replacing && !self.strict && is_continuation(byte) {
            let err = Utf8Error::InvalidByte {
                byte,
                offset,
                state: self.state.row(),
            };
            tracing::trace!(error = %err, "Folded stray continuation byte");
            return Ok(DecodeEvent::Folded(err));
        }
        self.replacing = false;

        match self.state.step(byte) {
            Step::Accept(c) => {
                self.sink.push_char(c);
                Ok(DecodeEvent::Emit(c))
            }
            Step::Pending => Ok(DecodeEvent::NeedMoreBytes),
            Step::Reject { state } => {
                self.replacing = true;
                self.sink.push_char(REPLACEMENT);
                let err = Utf8Error::InvalidByte {
                    byte,
                    offset,
                    state,
                };
                if self.strict {
                    Err(err)
                } else {
                    tracing::debug!(error = %err, "Replaced invalid UTF-8 byte");
                    Ok(DecodeEvent::Invalid(err))
                }
            }
        }
    }

    /// Feed a chunk. Strict mode stops at the first malformed byte; the
    /// bytes after it are left unconsumed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), Utf8Error> {
        for &byte in bytes {
            self.decode_byte(byte)?;
        }
        Ok(())
    }

    /// Feed a chunk while the sink holds at most `max_len` units.
    ///
    /// Returns `Ok(false)` as soon as the limit is exceeded, leaving the
    /// rest of `bytes` unconsumed.
    pub fn feed_limited(&mut self, bytes: &[u8], max_len: usize) -> Result<bool, Utf8Error> {
        for &byte in bytes {
            if self.sink.len() > max_len {
                return Ok(false);
            }
            self.decode_byte(byte)?;
        }
        Ok(self.sink.len() <= max_len)
    }

    /// Append an already decoded character.
    ///
    /// A pending sequence is cut short: it becomes a placeholder first.
    pub fn append_char(&mut self, c: char) -> Result<(), Utf8Error> {
        self.interrupt_pending()?;
        self.sink.push_char(c);
        Ok(())
    }

    /// Append already decoded text, with the same rule as [`append_char`](Self::append_char).
    pub fn append_str(&mut self, s: &str) -> Result<(), Utf8Error> {
        self.interrupt_pending()?;
        self.sink.push_str(s);
        Ok(())
    }

    fn interrupt_pending(&mut self) -> Result<(), Utf8Error> {
        self.replacing = false;
        if self.state.is_accept() {
            return Ok(());
        }
        let state = self.state.row();
        self.state.reset();
        self.sink.push_char(REPLACEMENT);
        if self.strict {
            Err(Utf8Error::InterruptedSequence { state })
        } else {
            Ok(())
        }
    }

    /// True iff no partial multi-byte sequence is outstanding.
    pub fn is_sequence_complete(&self) -> bool {
        self.state.is_accept()
    }

    /// Resolve the end of input.
    ///
    /// An outstanding partial sequence is replaced by one placeholder; strict
    /// mode then reports it as an error. Afterwards the decoder is always
    /// back in the accept state.
    pub fn finish(&mut self) -> Result<(), Utf8Error> {
        self.replacing = false;
        if self.state.is_accept() {
            return Ok(());
        }
        let err = Utf8Error::IncompleteSequence {
            offset: self.offset,
            state: self.state.row(),
        };
        self.state.reset();
        self.sink.push_char(REPLACEMENT);
        if self.strict {
            Err(err)
        } else {
            tracing::debug!(error = %err, "Replaced truncated UTF-8 sequence");
            Ok(())
        }
    }

    /// Same as [`finish`](Self::finish), for use at frame boundaries.
    pub fn check_state(&mut self) -> Result<(), Utf8Error> {
        self.finish()
    }

    /// Discard any partial sequence and restart the byte offset.
    ///
    /// Text already in the sink is kept.
    pub fn reset(&mut self) {
        self.state.reset();
        self.offset = 0;
        self.replacing = false;
    }

    /// Everything decoded so far, without any pending partial sequence.
    pub fn partial_string(&self) -> String {
        self.sink.to_text()
    }

    /// Like [`partial_string`](Self::partial_string), but also empties the
    /// sink. A sequence straddling the drain point stays pending.
    pub fn take_partial_string(&mut self) -> String {
        let text = self.sink.to_text();
        self.sink.clear();
        text
    }

    /// The decoded text with any truncated tail replaced, never failing.
    pub fn to_replaced_string(&mut self) -> String {
        if !self.state.is_accept() {
            let err = Utf8Error::IncompleteSequence {
                offset: self.offset,
                state: self.state.row(),
            };
            self.state.reset();
            self.sink.push_char(REPLACEMENT);
            tracing::warn!(error = %err, "Unable to get replacement string");
        }
        self.sink.to_text()
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

impl Default for Utf8Decoder<String> {
    fn default() -> Self {
        Self::new(String::new())
    }
}
