//! The proxy surface the widget consumes.

use async_trait::async_trait;
use genie_types::{GenieMessage, QueryResultEnvelope, ResultKey, SubmitResponse};

use crate::error::ApiError;

/// The three proxy operations.
///
/// [`crate::client::ProxyClient`] implements this over HTTP; tests use
/// scripted fakes.
#[async_trait]
pub trait GenieApi: Send + Sync {
    /// Start a conversation (`conversation_id == None`) or continue one.
    async fn submit_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SubmitResponse, ApiError>;

    /// Current state of a message.
    async fn poll_status(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<GenieMessage, ApiError>;

    /// Rows of a query attachment.
    async fn fetch_results(&self, key: &ResultKey) -> Result<QueryResultEnvelope, ApiError>;
}
