//! HTTP client for the genie-server proxy routes.

use std::time::Duration;

use async_trait::async_trait;
use genie_types::{
    GenieMessage, QueryResultEnvelope, ResultKey, ResultsStrategy, SubmitRequest, SubmitResponse,
};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::GenieApi;
use crate::error::{ApiError, WidgetError};

/// [`GenieApi`] over HTTP against `{base_url}/api/genie/...`.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: Url,
    strategy: ResultsStrategy,
}

impl ProxyClient {
    /// `base_url` is the origin the proxy is mounted on, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str, strategy: ResultsStrategy) -> Result<Self, WidgetError> {
        let base_url =
            Url::parse(base_url).map_err(|e| WidgetError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(WidgetError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .user_agent(concat!("genie-widget/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url,
            strategy,
        })
    }

    pub fn strategy(&self) -> ResultsStrategy {
        self.strategy
    }

    /// `{base}/api/genie/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "genie"]).extend(segments);
        }
        url
    }

    fn results_url(&self, key: &ResultKey) -> Url {
        match self.strategy {
            ResultsStrategy::AttachmentPath => self.endpoint(&[
                "results",
                &key.conversation_id,
                &key.message_id,
                &key.attachment_id,
            ]),
            ResultsStrategy::StatementId => self.endpoint(&["results", &key.statement_id()]),
        }
    }
}

/// Decode a 2xx body, or turn anything else into [`ApiError::Status`].
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        let error = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned()
            });
        return Err(ApiError::Status {
            status: status.as_u16(),
            error,
        });
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl GenieApi for ProxyClient {
    async fn submit_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SubmitResponse, ApiError> {
        let body = SubmitRequest {
            message: Some(text.to_owned()),
            conversation_id: conversation_id.map(str::to_owned),
        };
        let resp = self
            .client
            .post(self.endpoint(&["chat"]))
            .json(&body)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn poll_status(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<GenieMessage, ApiError> {
        let url = self.endpoint(&["poll", conversation_id, message_id]);
        debug!(%url, "polling message");
        let resp = self.client.get(url).send().await?;
        read_json(resp).await
    }

    async fn fetch_results(&self, key: &ResultKey) -> Result<QueryResultEnvelope, ApiError> {
        let resp = self.client.get(self.results_url(key)).send().await?;
        read_json(resp).await
    }
}
