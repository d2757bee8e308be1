//! Error types for the chat tagger.

/// Setup-time errors. These indicate programming mistakes and are raised
/// before any conversation is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Rule {name} is already registered")]
    DuplicateRule { name: String },

    #[error("No continuation policy configured for the exchange builder")]
    MissingContinuationPolicy,

    #[error("Unknown {kind} policy: {name}")]
    UnknownPolicy { kind: &'static str, name: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Message normalization errors raised by vendor adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{vendor} record is missing field `{field}`")]
    MissingField {
        vendor: &'static str,
        field: &'static str,
    },

    #[error("{vendor} record has an invalid timestamp: {value}")]
    InvalidTimestamp { vendor: &'static str, value: String },

    #[error("Unsupported conversation shape: {0}")]
    UnsupportedFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by a rule predicate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    #[error("Rule {rule} failed: {reason}")]
    Failed { rule: String, reason: String },
}

impl RuleError {
    pub fn failed(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// Errors loading an extracted export file.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export root must be an object or an array, got {0}")]
    UnrecognizedShape(&'static str),
}
