//! Admin API.
//!
//! # Routes
//! - `GET /admin/status`: server version, uptime, session and mapping counts
//! - `GET /admin/sessions`: snapshot of the open sessions
//! - `GET /admin/mappings`: registered path specs with their merged config
//! - `POST /admin/sessions/{id}/close`: close one session
//!
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/sessions", get(get_sessions))
        .route("/admin/mappings", get(get_mappings))
        .route("/admin/sessions/{id}/close", post(close_session))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
