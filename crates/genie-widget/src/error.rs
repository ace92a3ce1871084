use thiserror::Error;

/// Failures talking to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The proxy answered with a non-2xx status. `error` is the proxy's
    /// client-safe `error` field, or the canonical reason phrase.
    #[error("proxy returned {status}: {error}")]
    Status { status: u16, error: String },

    /// A 2xx body that is not the expected JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Failures constructing the widget.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("invalid proxy URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
