//! Conversation / message payloads.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

// ── Status ────────────────────────────────────────────────────────────────────

/// Remote lifecycle state of a message.
///
/// Only [`MessageStatus::Completed`] and [`MessageStatus::Failed`] are
/// terminal for polling; every other value (including ones this crate does
/// not know about) means "keep waiting".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Submitted,
    FetchingMetadata,
    FilteringContext,
    AskingAi,
    PendingWarehouse,
    ExecutingQuery,
    Pending,
    Completed,
    Failed,
    Cancelled,
    QueryResultExpired,
    #[serde(other)]
    Unknown,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Completed | MessageStatus::Failed)
    }
}

// ── Attachments ───────────────────────────────────────────────────────────────

/// Row-count summary attached to a query, or to a whole message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResultSummary {
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub statement_id: Option<String>,
}

/// A generated SQL query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAttachment {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub statement_id: Option<String>,
    #[serde(default)]
    pub query_result_metadata: Option<QueryResultSummary>,
}

impl QueryAttachment {
    pub fn row_count(&self) -> Option<u64> {
        self.query_result_metadata.as_ref().and_then(|m| m.row_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextAttachment {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedQuestions {
    #[serde(default)]
    pub questions: Vec<String>,
}

/// One attachment of a completed message.
///
/// The remote service sets exactly one of `query`, `text` or
/// `suggested_questions`; [`Attachment::contents`] yields whichever are
/// present in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub query: Option<QueryAttachment>,
    #[serde(default)]
    pub text: Option<TextAttachment>,
    #[serde(default)]
    pub suggested_questions: Option<SuggestedQuestions>,
}

/// Borrowed view over one variant of an [`Attachment`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttachmentContent<'a> {
    Query(&'a QueryAttachment),
    Text(&'a TextAttachment),
    SuggestedQuestions(&'a SuggestedQuestions),
}

impl Attachment {
    pub fn id(&self) -> Option<&str> {
        non_empty(self.attachment_id.as_deref())
    }

    pub fn contents(&self) -> impl Iterator<Item = AttachmentContent<'_>> {
        let query = self.query.as_ref().map(AttachmentContent::Query);
        let text = self.text.as_ref().map(AttachmentContent::Text);
        let suggested = self
            .suggested_questions
            .as_ref()
            .map(AttachmentContent::SuggestedQuestions);
        query.into_iter().chain(text).chain(suggested)
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// The remote message resource returned by polling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenieMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub status: Option<MessageStatus>,
    /// Legacy shape: the answer as a single string.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    /// Top-level result summary some API revisions attach to the message.
    #[serde(default)]
    pub query_result: Option<QueryResultSummary>,
}

impl GenieMessage {
    /// `message_id` if set, else `id`.
    pub fn message_id(&self) -> Option<&str> {
        non_empty(self.message_id.as_deref()).or_else(|| non_empty(self.id.as_deref()))
    }

    pub fn conversation_id(&self) -> Option<&str> {
        non_empty(self.conversation_id.as_deref())
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or_default()
    }

    pub fn row_count(&self) -> Option<u64> {
        self.query_result.as_ref().and_then(|q| q.row_count)
    }
}

// ── Submit ────────────────────────────────────────────────────────────────────

/// Body of `POST /api/genie/chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Response of a start-conversation / create-message call.
///
/// Start-conversation nests the message under `message`; create-message
/// returns the message object itself. Both shapes decode into this struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<GenieMessage>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

impl SubmitResponse {
    pub fn conversation_id(&self) -> Option<&str> {
        non_empty(self.conversation_id.as_deref())
            .or_else(|| self.message.as_ref().and_then(GenieMessage::conversation_id))
    }

    pub fn message_id(&self) -> Option<&str> {
        non_empty(self.message_id.as_deref())
            .or_else(|| non_empty(self.id.as_deref()))
            .or_else(|| self.message.as_ref().and_then(GenieMessage::message_id))
    }

    /// An answer delivered without polling.
    pub fn inline_answer(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| non_empty(m.content.as_deref()))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
