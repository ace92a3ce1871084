//! Addressing a query result.
//!
//! A result is identified by `(conversation id, message id, attachment id)`.
//! Depending on the deployed API revision the proxy exposes it either as
//! three path segments or as one composite statement id `c/m/a`; both are
//! named [`ResultsStrategy`] variants.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultKeyError {
    #[error("conversationId, messageId, and attachmentId are required")]
    MissingPart,

    #[error("Invalid statement ID format")]
    InvalidStatementId,

    #[error("Invalid ID format")]
    InvalidId,
}

/// Whether `id` can be used as one path segment of a remote Genie URL.
///
/// Ids are opaque, but the remote service only issues ASCII letters, digits,
/// `-`, `_` and `.`. Anything else is rejected, as is any `..` run.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.contains("..")
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// How the proxy's results route is shaped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ResultsStrategy {
    /// `results/{conversationId}/{messageId}/{attachmentId}`
    #[default]
    #[strum(serialize = "attachment-path", serialize = "attachment")]
    AttachmentPath,
    /// `results/{statementId}` with a `/`-delimited composite id.
    #[strum(serialize = "statement-id", serialize = "statement")]
    StatementId,
}

/// The three ids needed to fetch a query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultKey {
    pub conversation_id: String,
    pub message_id: String,
    pub attachment_id: String,
}

impl ResultKey {
    /// Build a key from its parts; every part must be non-blank and pass
    /// [`is_valid_id`].
    pub fn new(
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
        attachment_id: impl Into<String>,
    ) -> Result<Self, ResultKeyError> {
        let key = Self {
            conversation_id: conversation_id.into().trim().to_owned(),
            message_id: message_id.into().trim().to_owned(),
            attachment_id: attachment_id.into().trim().to_owned(),
        };
        if key.conversation_id.is_empty()
            || key.message_id.is_empty()
            || key.attachment_id.is_empty()
        {
            return Err(ResultKeyError::MissingPart);
        }
        if !key.parts().into_iter().all(is_valid_id) {
            return Err(ResultKeyError::InvalidId);
        }
        Ok(key)
    }

    /// Split a composite `conversation/message/attachment` id.
    ///
    /// Empty segments (doubled or surrounding slashes) are ignored; exactly
    /// three non-empty segments must remain, each passing [`is_valid_id`].
    pub fn parse_statement_id(statement_id: &str) -> Result<Self, ResultKeyError> {
        let parts: Vec<&str> = statement_id
            .split('/')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        match parts.as_slice() {
            [conversation, message, attachment]
                if parts.iter().copied().all(is_valid_id) =>
            {
                Ok(Self {
                    conversation_id: (*conversation).to_owned(),
                    message_id: (*message).to_owned(),
                    attachment_id: (*attachment).to_owned(),
                })
            }
            _ => Err(ResultKeyError::InvalidStatementId),
        }
    }

    pub fn parts(&self) -> [&str; 3] {
        [
            self.conversation_id.as_str(),
            self.message_id.as_str(),
            self.attachment_id.as_str(),
        ]
    }

    /// The composite form accepted by [`ResultKey::parse_statement_id`].
    pub fn statement_id(&self) -> String {
        format!(
            "{}/{}/{}",
            self.conversation_id, self.message_id, self.attachment_id
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
