//! Authoritative set of open sessions plus listener fan-out.
//!
//! # Responsibilities
//! - Track open sessions (insert on open, remove on close)
//! - Notify listeners in registration order
//! - Isolate listener faults (errors and panics)
//! - Close everything on shutdown
//!
//! # Design Decisions
//! - `DashMap` for the live set: concurrent open/close from unrelated
//!   connections only contend on a shard
//! - Listener list behind `ArcSwap`: notification iterates a snapshot,
//!   add/remove swap in a new list
//! - Closing an unknown or already closed session is a no-op

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use super::listener::{ListenerFault, SessionEvent, SessionListener};
use super::session::{Session, SessionError, SessionId};
use crate::observability::metrics;

pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    listeners: ArcSwap<Vec<Arc<dyn SessionListener>>>,
    faults: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            listeners: ArcSwap::from_pointee(Vec::new()),
            faults: AtomicU64::new(0),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&listener));
            next
        });
    }

    /// Remove a previously added listener. Unknown listeners are ignored.
    pub fn remove_listener(&self, listener: &Arc<dyn SessionListener>) -> bool {
        let mut removed = false;
        self.listeners.rcu(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|l| !std::ptr::addr_eq(Arc::as_ptr(*l), Arc::as_ptr(listener)))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.load().len()
    }

    /// Register a newly established session and announce it.
    pub fn on_open(&self, session: &Arc<Session>) {
        if !session.mark_open() {
            tracing::warn!(session_id = %session.id(), state = ?session.state(), "Ignoring open of a session that is not new");
            return;
        }
        self.sessions.insert(session.id(), Arc::clone(session));
        metrics::set_open_sessions(self.sessions.len());
        tracing::debug!(session_id = %session.id(), path = %session.path(), "Session opened");

        self.notify(SessionEvent::Opened(session));
    }

    /// Remove a session and announce it. Idempotent.
    pub fn on_close(&self, session: &Arc<Session>) {
        let removed = self.sessions.remove(&session.id()).is_some();
        let first_close = session.mark_closed();
        if !removed || !first_close {
            return;
        }
        metrics::set_open_sessions(self.sessions.len());
        tracing::debug!(session_id = %session.id(), path = %session.path(), "Session closed");

        self.notify(SessionEvent::Closed(session));
    }

    /// Announce a session-level error. Does not change the live set.
    pub fn on_error(&self, session: &Arc<Session>, error: &SessionError) {
        tracing::debug!(session_id = %session.id(), error = %error, "Session error");
        self.notify(SessionEvent::Error(session, error));
    }

    /// Deliver `event` to every listener, in registration order.
    ///
    /// Faults are logged, counted and returned; they never stop delivery
    /// to the remaining listeners.
    pub fn notify(&self, event: SessionEvent<'_>) -> Vec<ListenerFault> {
        let listeners = self.listeners.load_full();
        let mut faults = Vec::new();

        for (index, listener) in listeners.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| event.deliver(listener.as_ref())));
            let fault = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => ListenerFault::Failed {
                    index,
                    event: event.name(),
                    source,
                },
                Err(payload) => ListenerFault::Panicked {
                    index,
                    event: event.name(),
                    message: panic_message(payload.as_ref()),
                },
            };

            self.faults.fetch_add(1, Ordering::Relaxed);
            metrics::record_listener_fault(event.name());
            tracing::warn!(
                session_id = %event.session().id(),
                error = %fault,
                "Failure while invoking session listener"
            );
            faults.push(fault);
        }

        faults
    }

    /// Point-in-time copy of the open sessions.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Listener faults observed since startup.
    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    /// Close every open session. Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let sessions = self.snapshot();
        for session in &sessions {
            session.request_close();
            self.on_close(session);
        }
        if !sessions.is_empty() {
            tracing::info!(count = sessions.len(), "Closed all open sessions");
        }
        sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("open_sessions", &self.sessions.len())
            .field("listeners", &self.listener_count())
            .field("faults", &self.fault_count())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
