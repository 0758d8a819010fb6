//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a `WebSocketContainer`
//! - Mount the named built-in endpoints on their path specs
//! - Attach the logging session listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The container is frozen before the first listener binds

use std::sync::Arc;

use thiserror::Error;

use crate::config::ServerConfig;
use crate::endpoints;
use crate::session::{Session, SessionError, SessionListener};
use crate::upgrade::{UpgradeError, WebSocketContainer};
use crate::BoxError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("mapping {index}: unknown endpoint {endpoint:?}")]
    UnknownEndpoint { index: usize, endpoint: String },

    #[error("mapping {index}: {source}")]
    Mapping {
        index: usize,
        #[source]
        source: UpgradeError,
    },
}

/// Logs opens and closes at info level and session errors at warn.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl SessionListener for LoggingListener {
    fn on_session_opened(&self, session: &Arc<Session>) -> Result<(), BoxError> {
        tracing::info!(
            session_id = %session.id(),
            path = %session.path(),
            path_spec = %session.path_spec(),
            subprotocol = session.subprotocol().unwrap_or("-"),
            "Session opened"
        );
        Ok(())
    }

    fn on_session_closed(&self, session: &Arc<Session>) -> Result<(), BoxError> {
        tracing::info!(session_id = %session.id(), path = %session.path(), "Session closed");
        Ok(())
    }

    fn on_session_error(&self, session: &Arc<Session>, error: &SessionError) -> Result<(), BoxError> {
        tracing::warn!(session_id = %session.id(), error = %error, "Session error");
        Ok(())
    }
}

/// Build the container described by `config`.
pub fn build_container(config: &ServerConfig) -> Result<WebSocketContainer, StartupError> {
    let mut builder = WebSocketContainer::builder().with_defaults(config.websocket.clone());
    builder.add_listener(Arc::new(LoggingListener));

    for (index, mapping) in config.mappings.iter().enumerate() {
        let creator = endpoints::creator_for(&mapping.endpoint, builder.registry()).ok_or_else(|| {
            StartupError::UnknownEndpoint {
                index,
                endpoint: mapping.endpoint.clone(),
            }
        })?;
        builder
            .add_shared_mapping(&mapping.path_spec, creator, &mapping.overrides)
            .map_err(|source| StartupError::Mapping { index, source })?;

        tracing::info!(
            path_spec = %mapping.path_spec,
            endpoint = %mapping.endpoint,
            "Mapped endpoint"
        );
    }

    Ok(builder.build())
}
