//! Normalized message view shared by both vendor adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
///
/// Roles the adapters cannot classify are kept as `Unknown` with the raw
/// vendor string, so the message stays on the path instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    User,
    Assistant,
    System,
    Tool,
    Unknown(String),
}

impl AuthorRole {
    /// Classify a vendor role string. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Self::User,
            "assistant" | "model" | "ai" => Self::Assistant,
            "system" => Self::System,
            "tool" | "function" => Self::Tool,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl std::fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
            Self::Tool => write!(f, "tool"),
            Self::Unknown(raw) => write!(f, "unknown({})", raw),
        }
    }
}

/// A single message after vendor normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Vendor message id.
    pub id: String,
    /// Speaker.
    pub role: AuthorRole,
    /// Plain text body (parts joined with newlines).
    pub text: String,
    /// Creation time. Some exports omit it for system stubs.
    pub created_at: Option<DateTime<Utc>>,
}

impl NormalizedMessage {
    pub fn new(
        id: impl Into<String>,
        role: AuthorRole,
        text: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            text: text.into(),
            created_at,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == AuthorRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == AuthorRole::Assistant
    }
}
