//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum routers (WebSocket upgrades, admin API)
//! - Wire up middleware (tracing, request ID)
//! - Translate negotiation outcomes into HTTP responses
//! - Bind servers to listeners and shut them down together

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin;
use crate::config::ServerConfig;
use crate::http::websocket::serve_session;
use crate::lifecycle::Shutdown;
use crate::upgrade::{Completion, NegotiationError, UpgradeRequest, UpgradeResponse, WebSocketContainer};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub container: Arc<WebSocketContainer>,
    pub admin_key: Arc<str>,
    pub started_at: Instant,
}

/// HTTP server for WebSocket upgrades plus the optional admin API.
pub struct HttpServer {
    state: AppState,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig, container: Arc<WebSocketContainer>) -> Self {
        let state = AppState {
            container,
            admin_key: Arc::from(config.admin.api_key.as_str()),
            started_at: Instant::now(),
        };
        Self { state, config }
    }

    /// Router that drives every request through the upgrade engine.
    pub fn router(&self) -> Router {
        with_common_layers(
            Router::new()
                .fallback(upgrade_handler)
                .with_state(self.state.clone()),
        )
    }

    /// Admin API router (bearer-key protected).
    pub fn admin_router(&self) -> Router {
        with_common_layers(admin::setup_admin_router(self.state.clone()))
    }

    pub fn container(&self) -> &Arc<WebSocketContainer> {
        &self.state.container
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until `shutdown` triggers, then close every open session.
    pub async fn run(
        self,
        listener: TcpListener,
        admin_listener: Option<TcpListener>,
        shutdown: &Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(admin_listener) = admin_listener {
            let admin_addr = admin_listener.local_addr()?;
            let app = self.admin_router();
            let mut rx = shutdown.subscribe();
            tokio::spawn(async move {
                tracing::info!(address = %admin_addr, "Admin API listening");
                let served = axum::serve(admin_listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = rx.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API server failed");
                }
            });
        }

        let container = Arc::clone(&self.state.container);
        let mut rx = shutdown.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
                tracing::info!("Shutdown signal received, closing sessions");
                container.close_all();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn with_common_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

/// Runs every request through the container.
///
/// 404 when no mapping matches, 500 when negotiation failed, the creator's
/// status (default 503) when it declined, otherwise the 101 upgrade.
async fn upgrade_handler(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            if state.container.resolve(uri.path()).is_none() {
                return not_found(&request_id, uri.path());
            }
            tracing::debug!(request_id = %request_id, path = %uri.path(), "Not a WebSocket upgrade request");
            return rejection.into_response();
        }
    };

    let mut request = UpgradeRequest::from_parts(&uri, &headers);
    let mut response = UpgradeResponse::new();
    let (completion, outcome) = Completion::channel();

    if !state.container.handle(&mut request, &mut response, &completion).await {
        return not_found(&request_id, uri.path());
    }
    drop(completion);

    match outcome.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => return negotiation_failed(&request_id, &error),
        Err(_) => return negotiation_failed(&request_id, &NegotiationError::Cancelled),
    }

    let Some(session) = response.take_session() else {
        let (status, reason) = match response.rejection() {
            Some(rejection) => (
                StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
                rejection.reason.clone(),
            ),
            None => (
                StatusCode::SERVICE_UNAVAILABLE,
                "WebSocket upgrade declined".to_string(),
            ),
        };
        tracing::debug!(request_id = %request_id, status = %status, "Upgrade declined");
        let mut http = (status, reason).into_response();
        http.headers_mut().extend(response.headers().clone());
        return http;
    };

    let config = session.config();
    let mut ws = ws
        .read_buffer_size(config.input_buffer_size)
        .write_buffer_size(config.output_buffer_size)
        .max_message_size(config.max_message_size())
        .max_frame_size(config.max_frame_size);
    if let Some(protocol) = session.subprotocol() {
        ws = ws.protocols([protocol.to_string()]);
    }

    let registry = Arc::clone(state.container.registry());
    let failed_session = Arc::clone(&session);
    let failed_registry = Arc::clone(&registry);
    let mut http = ws
        .on_failed_upgrade(move |error| {
            tracing::warn!(session_id = %failed_session.id(), error = %error, "WebSocket upgrade failed");
            failed_registry.on_close(&failed_session);
        })
        .on_upgrade(move |socket| serve_session(socket, session, registry));
    http.headers_mut().extend(response.headers().clone());
    http
}

fn not_found(request_id: &str, path: &str) -> Response {
    tracing::debug!(request_id = %request_id, path = %path, "No WebSocket mapping matched");
    (StatusCode::NOT_FOUND, "No WebSocket mapping for path").into_response()
}

fn negotiation_failed(request_id: &str, error: &NegotiationError) -> Response {
    tracing::warn!(request_id = %request_id, error = %error, "WebSocket negotiation failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "WebSocket negotiation failed").into_response()
}
