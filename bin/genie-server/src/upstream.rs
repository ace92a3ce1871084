//! Calls to the remote Genie API.
//!
//! [`GenieUpstream`] is the seam between the HTTP handlers and the network:
//! the production implementation is [`HttpUpstream`] (reqwest); tests swap in
//! a recording fake so that "no remote call was made" can be asserted.

use std::time::Duration;

use async_trait::async_trait;
use genie_types::ResultKey;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use strum::Display;
use tracing::{debug, error};

use crate::config::GenieCredentials;
use crate::error::ServerError;

/// Which proxied operation a call belongs to; selects the generic message
/// returned to the browser when Genie answers with a non-2xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GenieOp {
    Submit,
    Poll,
    Results,
}

impl GenieOp {
    pub fn failure_message(self) -> &'static str {
        match self {
            GenieOp::Submit => "Failed to communicate with Genie",
            GenieOp::Poll => "Failed to poll message status",
            GenieOp::Results => "Failed to fetch query results",
        }
    }
}

/// Remote Genie operations used by the proxy routes.
///
/// Implementations return the remote JSON body untouched on success.
#[async_trait]
pub trait GenieUpstream: Send + Sync + 'static {
    /// `POST {space}/start-conversation`
    async fn start_conversation(
        &self,
        creds: &GenieCredentials,
        content: &str,
    ) -> Result<Value, ServerError>;

    /// `POST {space}/conversations/{conversation_id}/messages`
    async fn create_message(
        &self,
        creds: &GenieCredentials,
        conversation_id: &str,
        content: &str,
    ) -> Result<Value, ServerError>;

    /// `GET {space}/conversations/{conversation_id}/messages/{message_id}`
    async fn get_message(
        &self,
        creds: &GenieCredentials,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Value, ServerError>;

    /// `GET {space}/conversations/{c}/messages/{m}/query-result/{a}`
    async fn get_query_result(
        &self,
        creds: &GenieCredentials,
        key: &ResultKey,
    ) -> Result<Value, ServerError>;
}

// ── reqwest implementation ───────────────────────────────────────────────────

/// [`GenieUpstream`] over a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self, ServerError> {
        let client = Client::builder()
            .user_agent(concat!("genie-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn authorized(
        &self,
        builder: RequestBuilder,
        creds: &GenieCredentials,
    ) -> Result<RequestBuilder, ServerError> {
        Ok(builder
            .header(AUTHORIZATION, creds.bearer()?)
            .header(CONTENT_TYPE, "application/json"))
    }

    async fn send(&self, op: GenieOp, builder: RequestBuilder) -> Result<Value, ServerError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(operation = %op, status = status.as_u16(), body = %body, "Genie API error");
            return Err(ServerError::Upstream {
                status,
                message: op.failure_message().to_owned(),
            });
        }
        debug!(operation = %op, status = status.as_u16(), "Genie API ok");
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl GenieUpstream for HttpUpstream {
    async fn start_conversation(
        &self,
        creds: &GenieCredentials,
        content: &str,
    ) -> Result<Value, ServerError> {
        let url = creds.space_endpoint(&["start-conversation"])?;
        let req = self
            .authorized(self.client.post(url), creds)?
            .json(&json!({ "content": content }));
        self.send(GenieOp::Submit, req).await
    }

    async fn create_message(
        &self,
        creds: &GenieCredentials,
        conversation_id: &str,
        content: &str,
    ) -> Result<Value, ServerError> {
        let url = creds.space_endpoint(&["conversations", conversation_id, "messages"])?;
        let req = self
            .authorized(self.client.post(url), creds)?
            .json(&json!({ "content": content }));
        self.send(GenieOp::Submit, req).await
    }

    async fn get_message(
        &self,
        creds: &GenieCredentials,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<Value, ServerError> {
        let url = creds.space_endpoint(&[
            "conversations",
            conversation_id,
            "messages",
            message_id,
        ])?;
        let req = self.authorized(self.client.get(url), creds)?;
        self.send(GenieOp::Poll, req).await
    }

    async fn get_query_result(
        &self,
        creds: &GenieCredentials,
        key: &ResultKey,
    ) -> Result<Value, ServerError> {
        let url = creds.space_endpoint(&[
            "conversations",
            &key.conversation_id,
            "messages",
            &key.message_id,
            "query-result",
            &key.attachment_id,
        ])?;
        let req = self.authorized(self.client.get(url), creds)?;
        self.send(GenieOp::Results, req).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
