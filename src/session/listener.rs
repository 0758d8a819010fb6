//! Session lifecycle listeners.

use std::sync::Arc;

use thiserror::Error;

use super::session::{Session, SessionError};
use crate::BoxError;

/// Observer of session lifecycle events.
///
/// Returning an error (or panicking) only affects the listener itself: the
/// registry records the fault and carries on with the next listener.
pub trait SessionListener: Send + Sync {
    fn on_session_opened(&self, _session: &Arc<Session>) -> Result<(), BoxError> {
        Ok(())
    }

    fn on_session_closed(&self, _session: &Arc<Session>) -> Result<(), BoxError> {
        Ok(())
    }

    fn on_session_error(&self, _session: &Arc<Session>, _error: &SessionError) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A lifecycle event being fanned out.
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'a> {
    Opened(&'a Arc<Session>),
    Closed(&'a Arc<Session>),
    Error(&'a Arc<Session>, &'a SessionError),
}

impl<'a> SessionEvent<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Opened(_) => "opened",
            Self::Closed(_) => "closed",
            Self::Error(..) => "error",
        }
    }

    pub fn session(&self) -> &'a Arc<Session> {
        match self {
            Self::Opened(session) | Self::Closed(session) | Self::Error(session, _) => session,
        }
    }

    pub(crate) fn deliver(&self, listener: &dyn SessionListener) -> Result<(), BoxError> {
        match self {
            Self::Opened(session) => listener.on_session_opened(session),
            Self::Closed(session) => listener.on_session_closed(session),
            Self::Error(session, error) => listener.on_session_error(session, error),
        }
    }
}

/// A listener that failed while being notified, captured as a value.
#[derive(Debug, Error)]
pub enum ListenerFault {
    #[error("listener #{index} failed on {event} event: {source}")]
    Failed {
        index: usize,
        event: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("listener #{index} panicked on {event} event: {message}")]
    Panicked {
        index: usize,
        event: &'static str,
        message: String,
    },
}

impl ListenerFault {
    pub fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. } | Self::Panicked { index, .. } => *index,
        }
    }
}
