//! Vendor message adapters.
//!
//! Each adapter turns one vendor-specific raw message record into a
//! [`NormalizedMessage`]. Adapters do field extraction only; ordering,
//! branching, and grouping belong to the pipeline.

pub mod chatgpt;
pub mod claude;
pub mod raw;

use serde_json::Value;

use crate::error::AdapterError;
use crate::model::NormalizedMessage;

pub use chatgpt::ChatGptAdapter;
pub use claude::ClaudeAdapter;
pub use raw::{FlatConversation, RawConversation, TreeConversation};

/// Normalizes vendor message records.
pub trait MessageAdapter: Send + Sync {
    /// Vendor name for logs and errors.
    fn vendor(&self) -> &'static str;

    /// Extract `{id, role, text, created_at}` from a raw record.
    fn normalize(&self, raw: &Value) -> Result<NormalizedMessage, AdapterError>;

    /// Explicit parent reference carried by the record, if the vendor has one.
    fn parent_id(&self, _raw: &Value) -> Option<String> {
        None
    }

    /// Whether the record points at the vendor's root placeholder, i.e. it
    /// is one variant of the conversation's first prompt.
    fn has_root_parent(&self, _raw: &Value) -> bool {
        false
    }
}

/// Read an optional string field, treating empty strings as absent.
pub(crate) fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
