//! Tabular query results.
//!
//! The remote service has returned two envelopes over time:
//!
//! ```json
//! { "statement_response": { "result": { "data_array": [...] }, "manifest": { "schema": { "columns": [...] } } } }
//! { "result": { "data_array": [...] }, "manifest": { "schema": { "columns": [...] } } }
//! ```
//!
//! [`QueryResultEnvelope`] accepts both and [`QueryResultEnvelope::into_table`]
//! normalises them into a display-ready [`QueryTable`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSchema {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultManifest {
    #[serde(default)]
    pub schema: Option<ResultSchema>,
    #[serde(default)]
    pub total_row_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub data_array: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResponse {
    #[serde(default)]
    pub statement_id: Option<String>,
    #[serde(default)]
    pub manifest: Option<ResultManifest>,
    #[serde(default)]
    pub result: Option<ResultData>,
}

impl StatementResponse {
    fn has_content(&self) -> bool {
        self.manifest.is_some() || self.result.is_some()
    }
}

/// Either result envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResultEnvelope {
    #[serde(default)]
    pub statement_response: Option<StatementResponse>,
    #[serde(flatten)]
    pub inline: StatementResponse,
}

/// Column names plus rows with every cell already coerced to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Total rows reported by the manifest, or the number of rows fetched.
    pub total_rows: u64,
}

impl QueryTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }
}

impl QueryResultEnvelope {
    /// Normalise into a [`QueryTable`]; `None` when there are no columns or no rows.
    pub fn into_table(self) -> Option<QueryTable> {
        let response = match self.statement_response {
            Some(nested) if nested.has_content() => nested,
            _ => self.inline,
        };

        let manifest = response.manifest.unwrap_or_default();
        let columns: Vec<String> = manifest
            .schema
            .map(|s| s.columns.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = response
            .result
            .and_then(|r| r.data_array)
            .unwrap_or_default()
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        let total_rows = manifest.total_row_count.unwrap_or(rows.len() as u64);
        let table = QueryTable {
            columns,
            rows,
            total_rows,
        };
        (!table.is_empty()).then_some(table)
    }
}

/// Display text for one result cell. `null` becomes an empty string.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
