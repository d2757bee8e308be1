//! ChatGPT tree-export message adapter.
//!
//! Records look like:
//! `{"id", "author": {"role"}, "create_time": 1700000000.5,
//!   "content": {"content_type": "text", "parts": ["..."]}}`

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::adapters::{MessageAdapter, str_field};
use crate::error::AdapterError;
use crate::model::{AuthorRole, NormalizedMessage};

const VENDOR: &str = "chatgpt";

#[derive(Debug, Clone, Copy, Default)]
pub struct ChatGptAdapter;

impl ChatGptAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl MessageAdapter for ChatGptAdapter {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn normalize(&self, raw: &Value) -> Result<NormalizedMessage, AdapterError> {
        let id = str_field(raw, "id").ok_or(AdapterError::MissingField {
            vendor: VENDOR,
            field: "id",
        })?;

        let role = raw
            .get("author")
            .and_then(|a| a.get("role"))
            .and_then(Value::as_str)
            .map(AuthorRole::parse)
            .unwrap_or_else(|| AuthorRole::Unknown(String::new()));

        let created_at = match raw.get("create_time") {
            None | Some(Value::Null) => None,
            Some(value) => Some(epoch_to_datetime(value)?),
        };

        Ok(NormalizedMessage::new(id, role, extract_text(raw), created_at))
    }
}

fn epoch_to_datetime(value: &Value) -> Result<DateTime<Utc>, AdapterError> {
    let invalid = || AdapterError::InvalidTimestamp {
        vendor: VENDOR,
        value: value.to_string(),
    };
    let secs = value.as_f64().ok_or_else(invalid)?;
    if !secs.is_finite() {
        return Err(invalid());
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos).ok_or_else(invalid)
}

/// Join the textual parts of `content`. Non-string parts (images, file
/// pointers) are skipped; code/execution content carries a `text` field.
fn extract_text(raw: &Value) -> String {
    let Some(content) = raw.get("content") else {
        return String::new();
    };

    if let Some(parts) = content.get("parts").and_then(Value::as_array) {
        let texts: Vec<&str> = parts
            .iter()
            .filter_map(|p| p.as_str().or_else(|| p.get("text").and_then(Value::as_str)))
            .filter(|s| !s.is_empty())
            .collect();
        if !texts.is_empty() {
            return texts.join("\n");
        }
    }

    content
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
