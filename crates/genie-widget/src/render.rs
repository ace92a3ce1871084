//! Turns a completed Genie message into HTML for the chat log.
//!
//! Every interpolated value goes through minijinja's HTML auto-escaping, so
//! the output is safe to insert as markup. A query whose rows cannot be
//! fetched still renders: the block degrades to a metadata summary.

use genie_types::{AttachmentContent, GenieMessage, QueryAttachment, QueryTable, ResultKey};
use minijinja::{context, AutoEscape, Environment};
use serde::Serialize;
use tracing::warn;

use crate::api::GenieApi;

const QUERY: &str = "query.html";
const TEXT: &str = "text.html";
const SUGGESTIONS: &str = "suggestions.html";
const FALLBACK: &str = "fallback.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Rows shown before the table is truncated.
    pub max_table_rows: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { max_table_rows: 10 }
    }
}

/// Display model for a result table.
#[derive(Debug, Serialize)]
struct TableView {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    shown: usize,
    total: u64,
}

pub struct Renderer {
    env: Environment<'static>,
    options: RenderOptions,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template(QUERY, include_str!("../templates/query.html"))?;
        env.add_template(TEXT, include_str!("../templates/text.html"))?;
        env.add_template(SUGGESTIONS, include_str!("../templates/suggestions.html"))?;
        env.add_template(FALLBACK, include_str!("../templates/fallback.html"))?;
        Ok(Self { env, options })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render every attachment of `message` in order.
    ///
    /// `conversation_id` is used when the message does not carry its own.
    /// Row fetches go through `api`; their failures are logged and never
    /// returned. Only a template error is.
    pub async fn render<A>(
        &self,
        api: &A,
        conversation_id: Option<&str>,
        message: &GenieMessage,
    ) -> Result<String, minijinja::Error>
    where
        A: GenieApi + ?Sized,
    {
        let conversation_id = message.conversation_id().or(conversation_id);
        let message_id = message.message_id();
        let mut blocks = Vec::new();

        for attachment in message.attachments() {
            for content in attachment.contents() {
                match content {
                    AttachmentContent::Query(query) => {
                        let table = match ResultKey::new(
                            conversation_id.unwrap_or_default(),
                            message_id.unwrap_or_default(),
                            attachment.id().unwrap_or_default(),
                        ) {
                            Ok(key) => fetch_table(api, &key).await,
                            Err(e) => {
                                warn!(error = %e, "cannot fetch query rows; rendering summary");
                                None
                            }
                        };
                        blocks.push(self.render_query(query, table)?);
                    }
                    AttachmentContent::Text(text) => {
                        if let Some(content) = text.content.as_deref().filter(|c| !c.trim().is_empty()) {
                            blocks.push(self.env.get_template(TEXT)?.render(context! { content })?);
                        }
                    }
                    AttachmentContent::SuggestedQuestions(suggested) => {
                        if !suggested.questions.is_empty() {
                            blocks.push(
                                self.env
                                    .get_template(SUGGESTIONS)?
                                    .render(context! { questions => &suggested.questions })?,
                            );
                        }
                    }
                }
            }
        }

        if blocks.is_empty() {
            let content = message.content.as_deref().filter(|c| !c.trim().is_empty());
            blocks.push(
                self.env
                    .get_template(FALLBACK)?
                    .render(context! { content, row_count => message.row_count() })?,
            );
        }

        Ok(blocks.join("\n"))
    }

    fn render_query(
        &self,
        query: &QueryAttachment,
        table: Option<QueryTable>,
    ) -> Result<String, minijinja::Error> {
        let answer = table.as_ref().and_then(answer_line);
        let table = match (&answer, table) {
            (None, Some(table)) => Some(self.table_view(table)),
            _ => None,
        };
        self.env.get_template(QUERY)?.render(context! {
            description => query.description.as_deref().filter(|d| !d.trim().is_empty()),
            sql => query.query.as_deref().filter(|q| !q.trim().is_empty()),
            answer,
            table,
            row_count => query.row_count(),
        })
    }

    fn table_view(&self, table: QueryTable) -> TableView {
        let mut rows = table.rows;
        rows.truncate(self.options.max_table_rows);
        TableView {
            shown: rows.len(),
            columns: table.columns,
            rows,
            total: table.total_rows,
        }
    }
}

async fn fetch_table<A>(api: &A, key: &ResultKey) -> Option<QueryTable>
where
    A: GenieApi + ?Sized,
{
    match api.fetch_results(key).await {
        Ok(envelope) => {
            let table = envelope.into_table();
            if table.is_none() {
                warn!(statement_id = %key.statement_id(), "query returned no rows; rendering summary");
            }
            table
        }
        Err(e) => {
            warn!(statement_id = %key.statement_id(), error = %e, "failed to fetch query rows; rendering summary");
            None
        }
    }
}

/// A single row of one or two columns reads better as a sentence.
fn answer_line(table: &QueryTable) -> Option<String> {
    if table.rows.len() != 1 || table.columns.len() > 2 {
        return None;
    }
    match table.rows[0].as_slice() {
        [value] => Some(value.clone()),
        [label, value] => Some(format!("{label}: {value}")),
        _ => None,
    }
}
