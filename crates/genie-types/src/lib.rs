//! Wire types shared by the Genie proxy and the chat widget core.
//!
//! The proxy forwards remote JSON verbatim, so everything here is decoded
//! leniently: every field the remote service may omit is optional, and
//! unknown fields are ignored.

pub mod key;
pub mod message;
pub mod result;

pub use key::{is_valid_id, ResultKey, ResultKeyError, ResultsStrategy};
pub use message::{
    Attachment, AttachmentContent, GenieMessage, MessageStatus, QueryAttachment,
    QueryResultSummary, SubmitRequest, SubmitResponse, SuggestedQuestions, TextAttachment,
};
pub use result::{cell_text, QueryResultEnvelope, QueryTable, StatementResponse};
