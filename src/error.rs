//! Error taxonomy (ambient component A3).
//!
//! Startup-fatal errors ([`CacheError`], [`ConfigError`]) and per-request
//! errors ([`PipelineError`]) are kept as separate enums because they
//! propagate differently: the former abort the process before the server
//! binds, the latter become HTTP responses and never take the service down.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Fatal at construction time: a cache cannot exist with a bad capacity.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),
}

/// Fatal at startup: the service refuses to bind with a broken config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid route pattern {route:?}: {reason}")]
    InvalidRoute { route: String, reason: String },

    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: String,
        #[source]
        source: json5::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Per-request failures. These never abort the service; they map to an
/// HTTP status and are returned to the client.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    #[error("upstream timed out")]
    UpstreamTimeout,

    #[error("request cancelled")]
    CancelledRequest,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            PipelineError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::CancelledRequest => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}
