//! Per-connection socket pump.
//!
//! # Responsibilities
//! - Deliver inbound messages to the session's endpoint
//! - Enforce the text ceiling through `TextMessageAssembler`
//! - Enforce the binary ceiling and the idle timeout from the session config
//! - Forward messages queued through `Session::send_*`
//! - Unregister the session when the connection ends, however it ends
//!
//! # Data Flow
//! ```text
//! Client ──frames──▶ stream ──▶ TextMessageAssembler ──▶ Endpoint::on_text
//!                              (size ceiling)
//!                              (binary: size check)   ──▶ Endpoint::on_binary
//! Client ◀──frames── sink ◀── outbound queue ◀── Session::send_text/binary
//! ```
//!
//! # Design Decisions
//! - One task per connection; endpoint callbacks never run concurrently for
//!   the same session
//! - Ping/pong handled by the underlying protocol implementation
//! - axum hands over text messages already reassembled and UTF-8 checked by
//!   the protocol layer, so on this path the assembler only enforces
//!   `max_text_message_size` in decoded units; its invalid-text branch
//!   serves transports that deliver raw frame payloads
//! - Endpoint panics are caught per callback and close the connection with
//!   1011; a drop guard unregisters the session on every exit
//! - Close frames carry a protocol close code describing why we hung up

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use crate::session::registry::panic_message;
use crate::session::{OutboundMessage, Session, SessionError, SessionRegistry, TextMessageAssembler};

/// Why the pump stopped.
enum Exit {
    /// Peer closed or the connection dropped; nothing more to send.
    Peer,
    /// We close with this code and reason.
    Close(u16, &'static str),
}

/// Unregisters the session however the pump ends, unwinding included.
struct Unregister {
    session: Arc<Session>,
    registry: Arc<SessionRegistry>,
}

impl Drop for Unregister {
    fn drop(&mut self) {
        self.registry.on_close(&self.session);
    }
}

/// Pump one upgraded connection until it closes.
pub async fn serve_session(socket: WebSocket, session: Arc<Session>, registry: Arc<SessionRegistry>) {
    let (mut sink, mut stream) = socket.split();
    let _unregister = Unregister {
        session: Arc::clone(&session),
        registry: Arc::clone(&registry),
    };

    let Some(mut outbound) = session.take_outbound() else {
        tracing::warn!(session_id = %session.id(), "Session is already being served");
        return;
    };
    let mut close_rx = session.close_requested();
    let mut assembler = TextMessageAssembler::new(session.config());
    let idle = session.config().idle_timeout();
    let endpoint = Arc::clone(session.endpoint());

    tracing::debug!(session_id = %session.id(), path = %session.path(), "WebSocket connection open");
    let opened = guarded(&session, &registry, || endpoint.on_open(&session));

    let exit = loop {
        if !opened {
            break Exit::Close(close_code::ERROR, "endpoint failure");
        }

        if *close_rx.borrow_and_update() || !session.is_open() {
            break Exit::Close(close_code::AWAY, "server closing");
        }

        tokio::select! {
            incoming = next_message(&mut stream, idle) => {
                let message = match incoming {
                    Err(timeout) => {
                        report(&session, &registry, SessionError::IdleTimeout(timeout.as_secs()));
                        break Exit::Close(close_code::AWAY, "idle timeout");
                    }
                    Ok(None) => break Exit::Peer,
                    Ok(Some(Err(e))) => {
                        report(&session, &registry, SessionError::Transport(e.to_string()));
                        break Exit::Peer;
                    }
                    Ok(Some(Ok(message))) => message,
                };

                match message {
                    Message::Text(text) => match assembler.on_frame(text.as_str().as_bytes(), true) {
                        Ok(Some(text)) => {
                            if !guarded(&session, &registry, || endpoint.on_text(&session, text)) {
                                break Exit::Close(close_code::ERROR, "endpoint failure");
                            }
                        }
                        Ok(None) => {}
                        Err(error) => {
                            let code = close_code_for(&error);
                            report(&session, &registry, error);
                            break Exit::Close(code, "invalid text message");
                        }
                    },
                    Message::Binary(data) => {
                        let limit = session.config().max_binary_message_size;
                        if data.len() > limit {
                            report(&session, &registry, SessionError::MessageTooLarge { limit });
                            break Exit::Close(close_code::SIZE, "message too large");
                        }
                        if !guarded(&session, &registry, || endpoint.on_binary(&session, data)) {
                            break Exit::Close(close_code::ERROR, "endpoint failure");
                        }
                    }
                    Message::Ping(_) | Message::Pong(_) => {}
                    Message::Close(frame) => {
                        tracing::debug!(session_id = %session.id(), frame = ?frame, "Peer closed connection");
                        break Exit::Peer;
                    }
                }
            }
            Some(message) = outbound.recv() => {
                if let Err(e) = send(&mut sink, message).await {
                    report(&session, &registry, SessionError::Transport(e.to_string()));
                    break Exit::Peer;
                }
            }
            changed = close_rx.changed() => {
                if changed.is_err() {
                    break Exit::Peer;
                }
            }
        }
    };

    if let Exit::Close(code, reason) = exit {
        let frame = CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        };
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
            tracing::debug!(session_id = %session.id(), error = %e, "Failed to send close frame");
        }
    }

    guarded(&session, &registry, || endpoint.on_close(&session));
    tracing::debug!(session_id = %session.id(), "WebSocket connection closed");
}

/// Run one endpoint callback. A panic is reported to the registry's
/// listeners and yields `false`.
fn guarded(session: &Arc<Session>, registry: &SessionRegistry, callback: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            let error = SessionError::EndpointPanicked(panic_message(payload.as_ref()));
            tracing::error!(session_id = %session.id(), error = %error, "Endpoint callback panicked");
            registry.on_error(session, &error);
            false
        }
    }
}

async fn next_message(
    stream: &mut SplitStream<WebSocket>,
    idle: Option<Duration>,
) -> Result<Option<Result<Message, axum::Error>>, Duration> {
    match idle {
        Some(limit) => tokio::time::timeout(limit, stream.next())
            .await
            .map_err(|_| limit),
        None => Ok(stream.next().await),
    }
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, message: OutboundMessage) -> Result<(), axum::Error> {
    let message = match message {
        OutboundMessage::Text(text) => Message::Text(text.into()),
        OutboundMessage::Binary(data) => Message::Binary(data),
    };
    sink.send(message).await
}

fn report(session: &Arc<Session>, registry: &SessionRegistry, error: SessionError) {
    tracing::debug!(session_id = %session.id(), error = %error, "Session error");
    guarded(session, registry, || session.endpoint().on_error(session, &error));
    registry.on_error(session, &error);
}

fn close_code_for(error: &SessionError) -> u16 {
    match error {
        SessionError::MessageTooLarge { .. } => close_code::SIZE,
        SessionError::InvalidText(_) => close_code::INVALID,
        _ => close_code::ERROR,
    }
}
