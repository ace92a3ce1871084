//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** upstream error bodies are logged with full detail but
//! only a generic message plus a status echo is returned to the caller, so
//! Genie diagnostics never leak to browsers. The one deliberate exception is
//! [`ServerError::Transport`], whose message text is forwarded.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use genie_types::ResultKeyError;
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorBody;

pub const CONFIG_ERROR_MESSAGE: &str = "Server configuration error. Please contact administrator.";
pub const CONFIG_ERROR_DETAILS: &str = "Environment variables not configured";

/// All errors that can occur in the genie-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Credentials are missing or still carry the placeholder sentinel.
    #[error("genie credentials are not configured")]
    Config,

    /// The caller omitted a required field.
    #[error("validation error: {0}")]
    Validation(String),

    /// Genie answered with a non-2xx status. `message` is the generic,
    /// client-safe description of the failed operation.
    #[error("upstream returned {status}: {message}")]
    Upstream { status: StatusCode, message: String },

    /// The Genie call failed before a response was received, or the body
    /// could not be decoded.
    #[error("transport error: {0}")]
    Transport(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Config => {
                error!("genie credentials missing or unconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new(CONFIG_ERROR_MESSAGE).with_details(CONFIG_ERROR_DETAILS),
                )
            }
            ServerError::Validation(m) => (StatusCode::BAD_REQUEST, ErrorBody::new(m.as_str())),
            ServerError::Upstream { status, message } => (
                *status,
                ErrorBody::new(message.as_str())
                    .with_details(format!("Status: {}", status.as_u16())),
            ),
            ServerError::Transport(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal server error").with_message(m.as_str()),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ResultKeyError> for ServerError {
    fn from(e: ResultKeyError) -> Self {
        ServerError::Validation(e.to_string())
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(e: reqwest::Error) -> Self {
        error!(error = %e, "genie request failed");
        ServerError::Transport(e.to_string())
    }
}
