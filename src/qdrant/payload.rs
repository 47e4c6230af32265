//! Helpers for constructing and reading document payloads.

use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Descriptive fields mirrored into the point payload for each document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPayload {
    /// Owner of the document.
    pub owner_id: String,
    /// Human-supplied title.
    pub title: String,
    /// Extracted plain text.
    pub summary: String,
    /// Object store key of the original file.
    pub file: String,
}

impl DocumentPayload {
    /// Build the payload object stored alongside the document vector.
    pub fn into_map(self, document_id: &str, timestamp_rfc3339: &str) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            "document_id".into(),
            Value::String(document_id.to_string()),
        );
        payload.insert("owner_id".into(), Value::String(self.owner_id));
        payload.insert("title".into(), Value::String(self.title));
        payload.insert("summary".into(), Value::String(self.summary));
        payload.insert("file".into(), Value::String(self.file));
        payload.insert(
            "indexed_at".into(),
            Value::String(timestamp_rfc3339.to_string()),
        );
        payload
    }

    /// Read the descriptive fields back out of a stored payload.
    ///
    /// Missing or non-string fields decode as empty strings.
    pub fn from_map(payload: &Map<String, Value>) -> Self {
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            owner_id: field("owner_id"),
            title: field("title"),
            summary: field("summary"),
            file: field("file"),
        }
    }
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
