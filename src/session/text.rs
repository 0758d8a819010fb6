//! Text message reassembly on top of the streaming decoder.

use super::session::SessionError;
use crate::config::WebSocketConfig;
use crate::observability::metrics;
use crate::utf8::Utf8StringBuilder;

/// Validates and reassembles one connection's inbound text messages.
///
/// Frames are decoded as they arrive; only decoded text is held, never the
/// raw payload. A message is released once its final frame completes it.
#[derive(Debug)]
pub struct TextMessageAssembler {
    decoder: Utf8StringBuilder,
    max_size: usize,
}

impl TextMessageAssembler {
    pub fn new(config: &WebSocketConfig) -> Self {
        Self {
            decoder: Utf8StringBuilder::default(),
            max_size: config.max_text_message_size,
        }
    }

    /// Feed one frame payload. Returns the whole message once `fin` is set.
    ///
    /// On error the partial message is discarded and the assembler is ready
    /// for the next message.
    pub fn on_frame(&mut self, payload: &[u8], fin: bool) -> Result<Option<String>, SessionError> {
        match self.decoder.feed_limited(payload, self.max_size) {
            Ok(true) => {}
            Ok(false) => {
                self.discard();
                return Err(SessionError::MessageTooLarge {
                    limit: self.max_size,
                });
            }
            Err(err) => {
                self.discard();
                metrics::record_utf8_error();
                return Err(err.into());
            }
        }

        if !fin {
            return Ok(None);
        }
        if let Err(err) = self.decoder.finish() {
            self.discard();
            metrics::record_utf8_error();
            return Err(err.into());
        }
        self.decoder.reset();
        Ok(Some(self.decoder.take_partial_string()))
    }

    /// Bytes of decoded text held for the message in progress.
    pub fn pending_len(&self) -> usize {
        self.decoder.len()
    }

    fn discard(&mut self) {
        self.decoder.reset();
        self.decoder.take_partial_string();
    }
}
