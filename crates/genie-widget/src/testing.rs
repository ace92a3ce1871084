//! Scripted [`GenieApi`] for unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use genie_types::{
    GenieMessage, MessageStatus, QueryResultEnvelope, ResultKey, SubmitResponse,
};
use serde_json::json;

use crate::api::GenieApi;
use crate::error::ApiError;

pub(crate) struct ScriptedApi {
    submit: Result<SubmitResponse, ApiError>,
    submit_delay: Duration,
    submissions: Mutex<Vec<(String, Option<String>)>>,
    statuses: Vec<MessageStatus>,
    poll_error_at: Option<(u32, ApiError)>,
    poll_calls: AtomicU32,
    completed: GenieMessage,
    results: Result<QueryResultEnvelope, ApiError>,
    result_keys: Mutex<Vec<String>>,
}

impl ScriptedApi {
    /// Submits return `conv-1`/`msg-1`, the first poll is `COMPLETED` with a
    /// text answer, and result fetches answer 404.
    pub fn new() -> Self {
        Self {
            submit: Ok(serde_json::from_value(json!({
                "conversation_id": "conv-1",
                "message_id": "msg-1",
            }))
            .expect("valid submit response")),
            submit_delay: Duration::ZERO,
            submissions: Mutex::new(Vec::new()),
            statuses: vec![MessageStatus::Completed],
            poll_error_at: None,
            poll_calls: AtomicU32::new(0),
            completed: serde_json::from_value(json!({
                "attachments": [{ "attachment_id": "att-1", "text": { "content": "Hamilton has 7 titles." } }]
            }))
            .expect("valid message"),
            results: Err(ApiError::Status {
                status: 404,
                error: "Not Found".into(),
            }),
            result_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn with_submit(mut self, submit: Result<SubmitResponse, ApiError>) -> Self {
        self.submit = submit;
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Statuses returned by successive polls; the last one repeats.
    pub fn with_statuses(mut self, statuses: &[&str]) -> Self {
        self.statuses = statuses
            .iter()
            .map(|s| serde_json::from_value(json!(s)).expect("known status"))
            .collect();
        self
    }

    /// Fail the `n`th poll (1-based).
    pub fn with_poll_error_at(mut self, n: u32, error: ApiError) -> Self {
        self.poll_error_at = Some((n, error));
        self
    }

    pub fn with_completed(mut self, message: GenieMessage) -> Self {
        self.completed = message;
        self
    }

    pub fn with_results(mut self, results: Result<QueryResultEnvelope, ApiError>) -> Self {
        self.results = results;
        self
    }

    pub fn submissions(&self) -> Vec<(String, Option<String>)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn poll_calls(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn result_keys(&self) -> Vec<String> {
        self.result_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenieApi for ScriptedApi {
    async fn submit_message(
        &self,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<SubmitResponse, ApiError> {
        self.submissions
            .lock()
            .unwrap()
            .push((text.to_owned(), conversation_id.map(str::to_owned)));
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        self.submit.clone()
    }

    async fn poll_status(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<GenieMessage, ApiError> {
        let n = self.poll_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, error)) = &self.poll_error_at {
            if *at == n {
                return Err(error.clone());
            }
        }
        let status = self
            .statuses
            .get(n as usize - 1)
            .or(self.statuses.last())
            .copied()
            .unwrap_or(MessageStatus::Completed);
        let mut message = if status == MessageStatus::Completed {
            self.completed.clone()
        } else {
            GenieMessage::default()
        };
        message.id = Some(message_id.to_owned());
        message.conversation_id = Some(conversation_id.to_owned());
        message.status = Some(status);
        Ok(message)
    }

    async fn fetch_results(&self, key: &ResultKey) -> Result<QueryResultEnvelope, ApiError> {
        self.result_keys.lock().unwrap().push(key.statement_id());
        self.results.clone()
    }
}
