//! Single-fire completion signal for one exchange.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use super::error::{CompletionError, NegotiationError};

/// What the transport learns when an exchange completes.
pub type CompletionOutcome = Result<(), NegotiationError>;

type Callback = Box<dyn FnOnce(CompletionOutcome) + Send>;

struct Inner {
    callback: Mutex<Option<Callback>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let callback = self
            .callback
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(callback) = callback {
            tracing::debug!("Completion dropped before firing, failing exchange");
            callback(Err(NegotiationError::Cancelled));
        }
    }
}

/// Completion token for one exchange.
///
/// Clones share the same signal. The callback runs exactly once: on the
/// first `succeeded`/`failed`, or with [`NegotiationError::Cancelled`] when
/// the last clone is dropped without firing. Firing twice is rejected.
#[derive(Clone)]
pub struct Completion {
    inner: Arc<Inner>,
}

impl Completion {
    pub fn new(callback: impl FnOnce(CompletionOutcome) + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                callback: Mutex::new(Some(Box::new(callback))),
            }),
        }
    }

    /// Completion whose outcome is delivered on a channel.
    pub fn channel() -> (Self, oneshot::Receiver<CompletionOutcome>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        (completion, rx)
    }

    pub fn succeeded(&self) -> Result<(), CompletionError> {
        self.complete(Ok(()))
    }

    pub fn failed(&self, error: NegotiationError) -> Result<(), CompletionError> {
        self.complete(Err(error))
    }

    pub fn is_completed(&self) -> bool {
        self.inner
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn complete(&self, outcome: CompletionOutcome) -> Result<(), CompletionError> {
        let callback = self
            .inner
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match callback {
            Some(callback) => {
                callback(outcome);
                Ok(())
            }
            None => {
                tracing::error!(outcome = ?outcome, "Completion fired more than once");
                Err(CompletionError::AlreadyCompleted)
            }
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Completion, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let ok = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let (ok2, failed2) = (ok.clone(), failed.clone());
        let completion = Completion::new(move |outcome| {
            let counter = if outcome.is_ok() { &ok2 } else { &failed2 };
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (completion, ok, failed)
    }

    #[test]
    fn second_fire_is_rejected() {
        let (completion, ok, failed) = counting();
        assert!(completion.succeeded().is_ok());
        assert_eq!(completion.failed(NegotiationError::Cancelled), Err(CompletionError::AlreadyCompleted));
        assert_eq!(completion.succeeded(), Err(CompletionError::AlreadyCompleted));
        drop(completion);

        assert_eq!(ok.load(Ordering::SeqCst), 1);
        assert_eq!(failed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_unfired_completion_fails_it_once() {
        let (completion, ok, failed) = counting();
        let clone = completion.clone();
        drop(completion);
        assert_eq!(failed.load(Ordering::SeqCst), 0);
        drop(clone);

        assert_eq!(ok.load(Ordering::SeqCst), 0);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_the_signal() {
        let (completion, ok, _) = counting();
        let clone = completion.clone();
        clone.succeeded().unwrap();
        assert!(completion.is_completed());
        assert_eq!(ok.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channel_delivers_outcome() {
        let (completion, rx) = Completion::channel();
        completion.failed(NegotiationError::Panicked("boom".into())).unwrap();
        assert!(matches!(rx.await.unwrap(), Err(NegotiationError::Panicked(msg)) if msg == "boom"));
    }

    #[tokio::test]
    async fn channel_reports_cancel_on_drop() {
        let (completion, rx) = Completion::channel();
        drop(completion);
        assert!(matches!(rx.await.unwrap(), Err(NegotiationError::Cancelled)));
    }
}
