use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::WebSocketConfig;
use crate::http::server::AppState;
use crate::session::{SessionId, SessionInfo};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
    pub open_sessions: usize,
    pub mappings: usize,
    pub listeners: usize,
    pub listener_faults: u64,
}

#[derive(Debug, Serialize)]
pub struct MappingStatus {
    pub path_spec: String,
    pub group: String,
    pub config: WebSocketConfig,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let registry = state.container.registry();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        open_sessions: registry.len(),
        mappings: state.container.negotiators().len(),
        listeners: registry.listener_count(),
        listener_faults: registry.fault_count(),
    })
}

pub async fn get_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    let mut sessions: Vec<SessionInfo> = state
        .container
        .open_sessions()
        .iter()
        .map(|s| s.info())
        .collect();
    sessions.sort_by_key(|s| s.opened_at_unix);
    Json(sessions)
}

pub async fn get_mappings(State(state): State<AppState>) -> Json<Vec<MappingStatus>> {
    let mappings = state
        .container
        .negotiators()
        .iter()
        .map(|n| MappingStatus {
            path_spec: n.spec().to_string(),
            group: format!("{:?}", n.spec().group()),
            config: n.config().clone(),
        })
        .collect();
    Json(mappings)
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let id: SessionId = id.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let registry = state.container.registry();
    let session = registry.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    tracing::info!(session_id = %id, "Closing session on admin request");
    session.request_close();
    registry.on_close(&session);
    Ok(StatusCode::NO_CONTENT)
}
