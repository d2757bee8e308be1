//! Raw conversation shapes as they appear in the two export formats.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::adapters::{MessageAdapter, str_field};
use crate::error::AdapterError;
use crate::pipeline::graph::RawNode;

/// Tree-format conversation (`mapping` of node id → node).
#[derive(Debug, Clone, Deserialize)]
pub struct TreeConversation {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Node records in export order.
    pub mapping: Map<String, Value>,
}

impl TreeConversation {
    pub fn id(&self) -> &str {
        self.conversation_id
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Convert the mapping into raw nodes, normalizing each message.
    ///
    /// Records that are not objects are dropped. Link fields are read
    /// leniently: a non-string `parent` counts as absent and a missing or
    /// non-array `children` as empty, so the node and its message survive.
    /// Messages that fail normalization leave a message-less node so the
    /// path runs through it.
    pub fn to_nodes(&self, adapter: &dyn MessageAdapter) -> Vec<RawNode> {
        let mut nodes = Vec::with_capacity(self.mapping.len());
        for (key, record) in &self.mapping {
            if !record.is_object() {
                warn!(
                    conversation_id = %self.id(),
                    node = %key,
                    kind = json_kind(record),
                    "Skipping malformed node record"
                );
                continue;
            }

            let message = record.get("message").filter(|m| !m.is_null()).and_then(|raw| {
                adapter
                    .normalize(raw)
                    .map_err(|e| {
                        warn!(
                            conversation_id = %self.id(),
                            node = %key,
                            vendor = adapter.vendor(),
                            error = %e,
                            "Message failed normalization, skipping"
                        );
                    })
                    .ok()
            });

            let parent_id = match record.get("parent") {
                None | Some(Value::Null) => None,
                Some(Value::String(p)) if !p.is_empty() => Some(p.clone()),
                Some(other) => {
                    debug!(
                        conversation_id = %self.id(),
                        node = %key,
                        kind = json_kind(other),
                        "Ignoring unusable parent reference"
                    );
                    None
                }
            };

            let children_ids = match record.get("children") {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect(),
                _ => Vec::new(),
            };

            nodes.push(RawNode {
                id: str_field(record, "id").map_or_else(|| key.clone(), String::from),
                message,
                parent_id,
                children_ids,
            });
        }
        nodes
    }
}

/// Flat-format conversation (`chat_messages` in display order).
#[derive(Debug, Clone, Deserialize)]
pub struct FlatConversation {
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub chat_messages: Vec<Value>,
}

impl FlatConversation {
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Convert the message list into a parent chain.
    ///
    /// A message's parent is its explicit parent reference when that
    /// resolves within this export, otherwise the preceding message. When
    /// any message carries a parent link, a message-less sentinel root is
    /// added and messages pointing at the vendor's root placeholder hang
    /// off it, so edited first prompts become siblings for branch
    /// selection.
    pub fn to_nodes(&self, adapter: &dyn MessageAdapter) -> Vec<RawNode> {
        let ids: Vec<String> = self
            .chat_messages
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                str_field(raw, "uuid")
                    .map(String::from)
                    .unwrap_or_else(|| format!("{}:{}", self.uuid, i))
            })
            .collect();

        let linked = self
            .chat_messages
            .iter()
            .any(|raw| adapter.has_root_parent(raw) || adapter.parent_id(raw).is_some());
        let sentinel = linked.then(|| format!("{}:root", self.uuid));

        let mut nodes: Vec<RawNode> = Vec::with_capacity(ids.len() + 1);
        if let Some(root) = &sentinel {
            nodes.push(RawNode {
                id: root.clone(),
                ..RawNode::default()
            });
        }

        for (i, raw) in self.chat_messages.iter().enumerate() {
            let message = adapter
                .normalize(raw)
                .map_err(|e| {
                    warn!(
                        conversation_id = %self.uuid,
                        index = i,
                        vendor = adapter.vendor(),
                        error = %e,
                        "Message failed normalization, skipping"
                    );
                })
                .ok();

            let parent_id = if adapter.has_root_parent(raw) {
                sentinel.clone()
            } else {
                adapter
                    .parent_id(raw)
                    .filter(|p| *p != ids[i] && ids.contains(p))
                    .or_else(|| i.checked_sub(1).map(|prev| ids[prev].clone()))
                    .or_else(|| sentinel.clone())
            };

            nodes.push(RawNode {
                id: ids[i].clone(),
                message,
                parent_id,
                children_ids: Vec::new(),
            });
        }
        nodes
    }
}

/// A conversation in either supported export format.
#[derive(Debug, Clone)]
pub enum RawConversation {
    Tree(TreeConversation),
    Flat(FlatConversation),
}

impl RawConversation {
    /// Detect the format from the object's keys and deserialize it.
    pub fn from_value(value: Value) -> Result<Self, AdapterError> {
        let Some(obj) = value.as_object() else {
            return Err(AdapterError::UnsupportedFormat(format!(
                "expected an object, got {}",
                json_kind(&value)
            )));
        };

        if obj.contains_key("mapping") {
            Ok(Self::Tree(serde_json::from_value(value)?))
        } else if obj.contains_key("chat_messages") {
            Ok(Self::Flat(serde_json::from_value(value)?))
        } else {
            Err(AdapterError::UnsupportedFormat(
                "object has neither `mapping` nor `chat_messages`".into(),
            ))
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Tree(c) => c.id(),
            Self::Flat(c) => &c.uuid,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Tree(c) => c.title(),
            Self::Flat(c) => c.title(),
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            Self::Tree(_) => "tree",
            Self::Flat(_) => "flat",
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
