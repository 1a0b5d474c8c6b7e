//! HTTP error mapping for all handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tl_domain::error::Error;
use tl_domain::model::ResourceKind;
use tl_providers::RunStatus;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or unusable trust-boundary headers.
    #[error("{0}")]
    Unauthorized(String),

    #[error("User with this principal ID is not registered")]
    NotFound,

    #[error("User with this principal ID already exists")]
    Conflict,

    /// The referenced resource is not in the caller's own lists.
    #[error("{kind} {id} does not belong to this user")]
    Forbidden { kind: ResourceKind, id: String },

    #[error("{0}")]
    BadRequest(String),

    /// The run finished, but not as `completed`.
    #[error("chat completion failed: {status}")]
    RunNotCompleted { status: RunStatus },

    #[error("run {run_id} did not finish within {waited_ms}ms")]
    RunTimedOut { run_id: String, waited_ms: u64 },

    /// A call to the provider itself failed.
    #[error("provider call failed: {0}")]
    Provider(Error),

    #[error("document store: {0}")]
    Store(Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RunNotCompleted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RunTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Provider(Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Store(Error::StaleRevision { .. }) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the `code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Forbidden { .. } => "forbidden",
            Self::BadRequest(_) => "bad_request",
            Self::RunNotCompleted { .. } => "run_not_completed",
            Self::RunTimedOut { .. } => "run_timed_out",
            Self::Provider(Error::Timeout(_)) => "provider_timeout",
            Self::Provider(_) => "provider_error",
            Self::Store(Error::StaleRevision { .. }) => "stale_revision",
            Self::Store(_) => "store_error",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        } else {
            tracing::warn!(code, error = %self, "request rejected");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.to_string(), "code": code })),
        )
            .into_response()
    }
}
