//! JSON bodies owned by the proxy itself (everything else is Genie's shape,
//! forwarded verbatim).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned for every non-2xx proxy response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Fixed, client-safe description.
    pub error: String,
    /// Extra context, e.g. `"Status: 404"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Transport failure text (only for 500 transport errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            message: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether all Genie credentials are present and not placeholders.
    pub genie_configured: bool,
}
