//! Load an already-extracted export file.
//!
//! Accepts either a single conversation object or an array of them.
//! Entries that are not conversations are skipped with a warning so one
//! bad record never hides the rest of the export. Archive discovery and
//! unpacking happen elsewhere.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::adapters::RawConversation;
use crate::adapters::raw::json_kind;
use crate::error::ExportError;

/// Parse export JSON text into raw conversations.
pub fn parse_export(json: &str) -> Result<Vec<RawConversation>, ExportError> {
    let root: Value = serde_json::from_str(json)?;
    let entries = match root {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => return Err(ExportError::UnrecognizedShape(json_kind(&other))),
    };

    let conversations = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match RawConversation::from_value(value) {
            Ok(conversation) => Some(conversation),
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable export entry");
                None
            }
        })
        .collect();
    Ok(conversations)
}

/// Read and parse an export file.
pub async fn load_export(path: impl AsRef<Path>) -> Result<Vec<RawConversation>, ExportError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    let conversations = parse_export(&text)?;
    debug!(path = %path.display(), conversations = conversations.len(), "Loaded export");
    Ok(conversations)
}
