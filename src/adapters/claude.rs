//! Claude flat-export message adapter.
//!
//! Records look like:
//! `{"uuid", "sender": "human" | "assistant", "text", "created_at": RFC 3339,
//!   "content": [{"type": "text", "text": "..."}], "parent_message_uuid"?}`

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::adapters::{MessageAdapter, str_field};
use crate::error::AdapterError;
use crate::model::{AuthorRole, NormalizedMessage};

const VENDOR: &str = "claude";

/// Placeholder parent the Claude export uses for the first message.
const ROOT_PARENT_UUID: &str = "00000000-0000-4000-8000-000000000000";

#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeAdapter;

impl ClaudeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl MessageAdapter for ClaudeAdapter {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn normalize(&self, raw: &Value) -> Result<NormalizedMessage, AdapterError> {
        let id = str_field(raw, "uuid").ok_or(AdapterError::MissingField {
            vendor: VENDOR,
            field: "uuid",
        })?;

        let role = str_field(raw, "sender")
            .map(AuthorRole::parse)
            .unwrap_or_else(|| AuthorRole::Unknown(String::new()));

        let created_at = match str_field(raw, "created_at") {
            None => None,
            Some(value) => Some(
                DateTime::parse_from_rfc3339(value)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| AdapterError::InvalidTimestamp {
                        vendor: VENDOR,
                        value: value.to_string(),
                    })?,
            ),
        };

        Ok(NormalizedMessage::new(id, role, extract_text(raw), created_at))
    }

    fn parent_id(&self, raw: &Value) -> Option<String> {
        str_field(raw, "parent_message_uuid")
            .filter(|p| *p != ROOT_PARENT_UUID)
            .map(String::from)
    }

    fn has_root_parent(&self, raw: &Value) -> bool {
        str_field(raw, "parent_message_uuid") == Some(ROOT_PARENT_UUID)
    }
}

/// Prefer the top-level `text`; fall back to joining text blocks in `content`.
fn extract_text(raw: &Value) -> String {
    if let Some(text) = str_field(raw, "text") {
        return text.to_string();
    }
    raw.get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}
