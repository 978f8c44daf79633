use axum::response::{IntoResponse, Response};
use burrow_core::CoreError;
use burrow_storage::StorageError;
use http::StatusCode;
use thiserror::Error;
use tracing::{debug, error};

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Every failure a request can end in.
///
/// Converted once, at the dispatcher boundary, into a response that carries
/// only a status code.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("path does not name a valid identifier")]
    InvalidIdentifier,
    #[error("no endpoint configured for '{0}'")]
    UnknownEndpoint(String),
    #[error("configuration error: {0}")]
    Misconfigured(String),
    #[error("request contained no content to store")]
    EmptyPayload,
    #[error("nothing to forward to the shortener")]
    EmptyForward,
    #[error("upstream answered {status}")]
    Upstream { status: StatusCode },
    #[error("method {0} is not supported here")]
    UnsupportedMethod(http::Method),
    #[error("request body rejected: {reason}")]
    BodyRejected { status: StatusCode, reason: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidIdentifier => StatusCode::NOT_FOUND,
            GatewayError::EmptyPayload => StatusCode::BAD_REQUEST,
            GatewayError::Upstream { status } => *status,
            GatewayError::BodyRejected { status, .. } => *status,
            GatewayError::UnknownEndpoint(_)
            | GatewayError::Misconfigured(_)
            | GatewayError::EmptyForward
            | GatewayError::UnsupportedMethod(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for GatewayError {
    fn from(err: CoreError) -> Self {
        GatewayError::Misconfigured(err.to_string())
    }
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        match err.upstream_status() {
            Some(status) => GatewayError::Upstream { status },
            None => GatewayError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            GatewayError::Internal(_) | GatewayError::Misconfigured(_) => {
                error!(error = %self, "request failed");
            }
            _ => debug!(error = %self, status = %status, "request rejected"),
        }
        status.into_response()
    }
}
