//! Byte-at-a-time UTF-8 automaton.
//!
//! Byte values are first folded into one of twelve character classes, then
//! `(state + class)` indexes the transition table. States are multiples of
//! 12 so the addition lands on the right row without a multiply.
//!
//! Based on Bjoern Hoehrmann's DFA decoder
//! (<http://bjoern.hoehrmann.de/utf-8/decoder/dfa/>), MIT licensed:
//!
//! Copyright (c) 2008-2009 Bjoern Hoehrmann <bjoern@hoehrmann.de>

pub(crate) const ACCEPT: u8 = 0;
pub(crate) const REJECT: u8 = 12;

#[rustfmt::skip]
static BYTE_CLASS: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    8, 8, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    10, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 3, 3, 11, 6, 6, 6, 5, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8,
];

#[rustfmt::skip]
static TRANSITIONS: [u8; 108] = [
    0, 12, 24, 36, 60, 96, 84, 12, 12, 12, 48, 72, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
    12, 0, 12, 12, 12, 12, 12, 0, 12, 0, 12, 12, 12, 24, 12, 12, 12, 12, 12, 24, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 24, 12, 12, 12, 12, 12, 24, 12, 12, 12, 12, 12, 12, 12, 24, 12, 12,
    12, 12, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12, 12, 36, 12, 12, 12, 12, 12, 36, 12, 36, 12, 12,
    12, 36, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12,
];

/// Result of feeding one byte to the automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A complete scalar value was assembled.
    Accept(char),
    /// More continuation bytes are expected.
    Pending,
    /// The byte cannot continue (or start) a valid sequence.
    ///
    /// `state` is the automaton row the byte was rejected from. The
    /// automaton is already back in the accept state.
    Reject { state: u8 },
}

/// Minimal resumable decode state: automaton index plus partial code point.
///
/// `is_accept()` holds exactly when no multi-byte sequence is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderState {
    state: u8,
    codepoint: u32,
}

impl DecoderState {
    pub const fn new() -> Self {
        Self {
            state: ACCEPT,
            codepoint: 0,
        }
    }

    /// Feed a single byte. Pure computation, never fails.
    pub fn step(&mut self, byte: u8) -> Step {
        if byte < 0x80 && self.state == ACCEPT {
            self.codepoint = 0;
            return Step::Accept(byte as char);
        }

        let class = BYTE_CLASS[byte as usize];
        self.codepoint = if self.state == ACCEPT {
            (0xFF >> class) & u32::from(byte)
        } else {
            (u32::from(byte) & 0x3F) | (self.codepoint << 6)
        };

        let from = self.state;
        let next = TRANSITIONS[(from + class) as usize];
        match next {
            ACCEPT => {
                self.state = ACCEPT;
                // The table only accepts scalar values, so this cannot miss.
                match char::from_u32(self.codepoint) {
                    Some(c) => Step::Accept(c),
                    None => {
                        self.codepoint = 0;
                        Step::Reject { state: from / 12 }
                    }
                }
            }
            REJECT => {
                self.reset();
                Step::Reject { state: from / 12 }
            }
            _ => {
                self.state = next;
                Step::Pending
            }
        }
    }

    /// True when no multi-byte sequence is outstanding.
    pub fn is_accept(&self) -> bool {
        self.state == ACCEPT
    }

    /// Automaton row (0 = accept), as reported in diagnostics.
    pub fn row(&self) -> u8 {
        self.state / 12
    }

    /// Partial code point accumulated so far.
    pub fn codepoint(&self) -> u32 {
        self.codepoint
    }

    /// Drop any pending sequence.
    pub fn reset(&mut self) {
        self.state = ACCEPT;
        self.codepoint = 0;
    }
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::new()
    }
}
