//! The upgrade engine: mapping table, creators and the session registry.
//!
//! # Responsibilities
//! - Collect mappings during setup (builder), then freeze them
//! - Drive one request through resolve → negotiate → establish/decline/fail
//! - Guarantee the exchange's completion fires exactly once
//! - Register established sessions with the registry
//!
//! # Data Flow
//! ```text
//! handle(request, response, completion)
//!     → NegotiatorMap::resolve ── none ──▶ false (not handled)
//!     → creator.create (errors + panics caught)
//!     → Some(endpoint): Session::new + registry.on_open + completion.succeeded
//!     → None:           completion.succeeded (declined)
//!     → fault:          completion.failed
//!     → true
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use super::completion::Completion;
use super::creator::WebSocketCreator;
use super::error::{NegotiationError, UpgradeError};
use super::negotiator::{Negotiator, NegotiatorMap};
use super::request::{UpgradeRequest, UpgradeResponse};
use crate::config::{ConfigOverrides, WebSocketConfig};
use crate::observability::metrics;
use crate::pathmap::{MatchedPath, PathSpec};
use crate::session::registry::panic_message;
use crate::session::{Session, SessionListener, SessionRegistry};

/// Setup-phase view of the container.
#[derive(Debug, Default)]
pub struct WebSocketContainerBuilder {
    defaults: WebSocketConfig,
    negotiators: NegotiatorMap,
    registry: Arc<SessionRegistry>,
}

impl WebSocketContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the container-wide defaults. Only mappings added afterwards
    /// pick them up.
    pub fn with_defaults(mut self, defaults: WebSocketConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults_mut(&mut self) -> &mut WebSocketConfig {
        &mut self.defaults
    }

    /// Map `spec` to `creator` with the current defaults.
    pub fn add_mapping(
        &mut self,
        spec: &str,
        creator: impl WebSocketCreator,
    ) -> Result<&mut Self, UpgradeError> {
        self.add_mapping_with(spec, creator, &ConfigOverrides::default())
    }

    /// Map `spec` to `creator` with per-path overrides.
    pub fn add_mapping_with(
        &mut self,
        spec: &str,
        creator: impl WebSocketCreator,
        overrides: &ConfigOverrides,
    ) -> Result<&mut Self, UpgradeError> {
        self.add_shared_mapping(spec, Arc::new(creator), overrides)
    }

    pub fn add_shared_mapping(
        &mut self,
        spec: &str,
        creator: Arc<dyn WebSocketCreator>,
        overrides: &ConfigOverrides,
    ) -> Result<&mut Self, UpgradeError> {
        let spec = PathSpec::parse(spec)?;
        self.negotiators
            .register(spec.clone(), creator, &self.defaults, overrides)?;
        tracing::debug!(path_spec = %spec, "Registered WebSocket mapping");
        Ok(self)
    }

    pub fn add_listener(&mut self, listener: Arc<dyn SessionListener>) -> &mut Self {
        self.registry.add_listener(listener);
        self
    }

    /// Registry the built container will use. Endpoints that broadcast
    /// need it before the container exists.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn build(self) -> WebSocketContainer {
        tracing::info!(mappings = self.negotiators.len(), "WebSocket container ready");
        WebSocketContainer {
            defaults: self.defaults,
            negotiators: self.negotiators,
            registry: self.registry,
        }
    }
}

/// Frozen mapping table plus the live session registry.
#[derive(Debug)]
pub struct WebSocketContainer {
    defaults: WebSocketConfig,
    negotiators: NegotiatorMap,
    registry: Arc<SessionRegistry>,
}

/// Fails the completion if negotiation is abandoned mid-flight.
struct CancelGuard<'a> {
    completion: &'a Completion,
    armed: bool,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if self.armed && !self.completion.is_completed() {
            tracing::debug!("Negotiation dropped before completing");
            let _ = self.completion.failed(NegotiationError::Cancelled);
        }
    }
}

impl WebSocketContainer {
    pub fn builder() -> WebSocketContainerBuilder {
        WebSocketContainerBuilder::new()
    }

    /// Run one upgrade request through negotiation.
    ///
    /// Returns `false` when no mapping matches; the request and the
    /// completion are left untouched for another handler. Otherwise returns
    /// `true` and the completion has fired exactly once. An established
    /// session is available through [`UpgradeResponse::take_session`].
    pub async fn handle(
        &self,
        request: &mut UpgradeRequest,
        response: &mut UpgradeResponse,
        completion: &Completion,
    ) -> bool {
        let Some((negotiator, matched)) = self.negotiators.resolve(request.path()) else {
            tracing::trace!(path = %request.path(), "No WebSocket mapping for path");
            return false;
        };

        request.set_matched(matched.clone());
        response.set_config(negotiator.config().clone());

        let mut guard = CancelGuard {
            completion,
            armed: true,
        };
        let outcome = self
            .negotiate(&negotiator, matched, request, response, completion)
            .await;
        guard.armed = false;

        metrics::record_upgrade(outcome);
        true
    }

    async fn negotiate(
        &self,
        negotiator: &Negotiator,
        matched: MatchedPath,
        request: &UpgradeRequest,
        response: &mut UpgradeResponse,
        completion: &Completion,
    ) -> &'static str {
        // The call itself sits inside the boundary: a creator may panic
        // before it hands back a future.
        let created = AssertUnwindSafe(async {
            negotiator
                .creator()
                .create(request, &mut *response, completion)
                .await
        })
        .catch_unwind()
        .await;

        let error = match created {
            Ok(Ok(Some(endpoint))) => {
                if completion.is_completed() {
                    tracing::warn!(
                        path = %request.path(),
                        "Creator completed the exchange and returned an endpoint, discarding it"
                    );
                    return "declined";
                }

                let session = Arc::new(Session::new(
                    matched,
                    response.config().clone(),
                    response.accepted_subprotocol().map(str::to_string),
                    endpoint,
                ));
                tracing::debug!(
                    session_id = %session.id(),
                    path = %request.path(),
                    path_spec = %negotiator.spec(),
                    "WebSocket session established"
                );
                self.registry.on_open(&session);
                response.set_session(session);
                let _ = completion.succeeded();
                return "established";
            }
            Ok(Ok(None)) => {
                tracing::debug!(path = %request.path(), "Creator declined upgrade");
                if !completion.is_completed() {
                    let _ = completion.succeeded();
                }
                return "declined";
            }
            Ok(Err(source)) => NegotiationError::Creator(source),
            Err(payload) => NegotiationError::Panicked(panic_message(payload.as_ref())),
        };

        tracing::warn!(path = %request.path(), error = %error, "WebSocket negotiation failed");
        let _ = completion.failed(error);
        "failed"
    }

    pub fn resolve(&self, path: &str) -> Option<(Arc<Negotiator>, MatchedPath)> {
        self.negotiators.resolve(path)
    }

    /// Point-in-time copy of the open sessions.
    pub fn open_sessions(&self) -> Vec<Arc<Session>> {
        self.registry.snapshot()
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.registry.add_listener(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn SessionListener>) -> bool {
        self.registry.remove_listener(listener)
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Defaults as they were when the container was built.
    pub fn defaults(&self) -> &WebSocketConfig {
        &self.defaults
    }

    pub fn negotiators(&self) -> &NegotiatorMap {
        &self.negotiators
    }

    pub fn close_all(&self) -> usize {
        self.registry.close_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Endpoint;
    use crate::upgrade::creator::{creator_fn, CreateResult};
    use crate::upgrade::completion::CompletionOutcome;
    use crate::BoxError;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop;
    impl Endpoint for Noop {}

    fn accepting() -> impl WebSocketCreator {
        creator_fn(|_, _, _| -> CreateResult { Ok(Some(Arc::new(Noop))) })
    }

    async fn run(
        container: &WebSocketContainer,
        path: &str,
    ) -> (bool, UpgradeRequest, UpgradeResponse, Option<CompletionOutcome>) {
        let mut request = UpgradeRequest::new(path);
        let mut response = UpgradeResponse::new();
        let (completion, mut rx) = Completion::channel();
        let handled = container.handle(&mut request, &mut response, &completion).await;
        let outcome = rx.try_recv().ok();
        (handled, request, response, outcome)
    }

    #[tokio::test]
    async fn unmatched_path_leaves_completion_pending() {
        let mut builder = WebSocketContainer::builder();
        builder.add_mapping("/chat/*", accepting()).unwrap();
        let container = builder.build();

        let (handled, request, _, outcome) = run(&container, "/news").await;
        assert!(!handled);
        assert!(request.matched().is_none());
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn established_session_is_registered() {
        let mut builder = WebSocketContainer::builder();
        builder.add_mapping("/chat/*", accepting()).unwrap();
        let container = builder.build();

        let (handled, request, mut response, outcome) = run(&container, "/chat/room1").await;
        assert!(handled);
        assert!(matches!(outcome, Some(Ok(()))));
        assert_eq!(request.path_spec().map(ToString::to_string).as_deref(), Some("/chat/*"));

        let session = response.take_session().unwrap();
        assert!(session.is_open());
        assert_eq!(container.open_sessions().len(), 1);
        assert_eq!(container.close_all(), 1);
        assert!(container.open_sessions().is_empty());
    }

    #[tokio::test]
    async fn declined_upgrade_still_completes() {
        let mut builder = WebSocketContainer::builder();
        builder
            .add_mapping(
                "/chat/*",
                creator_fn(|_, response, _| -> CreateResult {
                    response.send_error(400, "unsupported subprotocol");
                    Ok(None)
                }),
            )
            .unwrap();
        let container = builder.build();

        let (handled, _, response, outcome) = run(&container, "/chat/x").await;
        assert!(handled);
        assert!(matches!(outcome, Some(Ok(()))));
        assert_eq!(response.rejection().map(|r| r.status), Some(400));
        assert!(response.session().is_none());
        assert!(container.open_sessions().is_empty());
    }

    #[tokio::test]
    async fn creator_error_fails_completion() {
        let mut builder = WebSocketContainer::builder();
        builder
            .add_mapping(
                "/chat/*",
                creator_fn(|_, _, _| -> CreateResult { Err("backend unavailable".into()) }),
            )
            .unwrap();
        let container = builder.build();

        let (handled, _, _, outcome) = run(&container, "/chat/x").await;
        assert!(handled);
        match outcome {
            Some(Err(NegotiationError::Creator(e))) => assert_eq!(e.to_string(), "backend unavailable"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn creator_panic_is_contained() {
        let mut builder = WebSocketContainer::builder();
        builder
            .add_mapping(
                "/chat/*",
                creator_fn(|_, _, _| -> CreateResult { panic!("creator exploded") }),
            )
            .unwrap();
        let container = builder.build();

        let (handled, _, _, outcome) = run(&container, "/chat/x").await;
        assert!(handled);
        assert!(matches!(outcome, Some(Err(NegotiationError::Panicked(m))) if m == "creator exploded"));
        assert!(container.open_sessions().is_empty());
    }

    #[tokio::test]
    async fn creator_that_completes_itself_is_not_completed_twice() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut builder = WebSocketContainer::builder();
        builder
            .add_mapping(
                "/chat/*",
                creator_fn(|_, _, completion| -> CreateResult {
                    completion.succeeded()?;
                    Ok(None)
                }),
            )
            .unwrap();
        let container = builder.build();

        let mut request = UpgradeRequest::new("/chat/x");
        let mut response = UpgradeResponse::new();
        let counter = fired.clone();
        let completion = Completion::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(container.handle(&mut request, &mut response, &completion).await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mappings_snapshot_defaults_at_registration() {
        let mut builder = WebSocketContainer::builder();
        builder.add_mapping("/early", accepting()).unwrap();
        builder.defaults_mut().max_text_message_size = 7;
        builder.add_mapping("/late", accepting()).unwrap();
        let container = builder.build();

        let early = container.resolve("/early").unwrap().0;
        let late = container.resolve("/late").unwrap().0;
        assert_eq!(early.config().max_text_message_size, 64 * 1024);
        assert_eq!(late.config().max_text_message_size, 7);
    }

    #[tokio::test]
    async fn response_config_is_a_private_copy() {
        let mut builder = WebSocketContainer::builder();
        builder
            .add_mapping(
                "/chat/*",
                creator_fn(|_, response, _| -> CreateResult {
                    response.config_mut().idle_timeout_secs = 1;
                    Ok(Some(Arc::new(Noop)))
                }),
            )
            .unwrap();
        let container = builder.build();

        let (_, _, mut response, _) = run(&container, "/chat/x").await;
        let session = response.take_session().unwrap();
        assert_eq!(session.config().idle_timeout_secs, 1);
        let (negotiator, _) = container.resolve("/chat/x").unwrap();
        assert_eq!(negotiator.config().idle_timeout_secs, 30);
        assert_eq!(container.defaults().idle_timeout_secs, 30);
    }

    struct PanicsBeforeFuture;

    impl WebSocketCreator for PanicsBeforeFuture {
        fn create<'a>(
            &'a self,
            _request: &'a UpgradeRequest,
            _response: &'a mut UpgradeResponse,
            _completion: &'a Completion,
        ) -> BoxFuture<'a, CreateResult> {
            panic!("no future for you");
        }
    }

    #[tokio::test]
    async fn creator_panicking_outside_its_future_is_contained() {
        let mut builder = WebSocketContainer::builder();
        builder.add_mapping("/chat/*", PanicsBeforeFuture).unwrap();
        let container = builder.build();

        let mut request = UpgradeRequest::new("/chat/x");
        let mut response = UpgradeResponse::new();
        let (completion, rx) = Completion::channel();
        let handled = AssertUnwindSafe(container.handle(&mut request, &mut response, &completion))
            .catch_unwind()
            .await;

        assert!(matches!(handled, Ok(true)));
        drop(completion);
        assert!(matches!(
            rx.await.unwrap(),
            Err(NegotiationError::Panicked(m)) if m == "no future for you"
        ));
        assert!(container.open_sessions().is_empty());
    }

    struct Stalled;

    impl WebSocketCreator for Stalled {
        fn create<'a>(
            &'a self,
            _request: &'a UpgradeRequest,
            _response: &'a mut UpgradeResponse,
            _completion: &'a Completion,
        ) -> BoxFuture<'a, Result<Option<Arc<dyn Endpoint>>, BoxError>> {
            Box::pin(futures_util::future::pending::<CreateResult>())
        }
    }

    #[tokio::test]
    async fn dropped_negotiation_is_cancelled() {
        let mut builder = WebSocketContainer::builder();
        builder.add_mapping("/slow", Stalled).unwrap();
        let container = builder.build();

        let mut request = UpgradeRequest::new("/slow");
        let mut response = UpgradeResponse::new();
        let (completion, rx) = Completion::channel();
        {
            let handle = container.handle(&mut request, &mut response, &completion);
            let timed_out =
                tokio::time::timeout(std::time::Duration::from_millis(10), handle).await;
            assert!(timed_out.is_err());
        }
        assert!(matches!(rx.await.unwrap(), Err(NegotiationError::Cancelled)));
    }
}
