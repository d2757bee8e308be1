//! Tagging output: per-conversation results and rule diagnostics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Annotations, Conversation, Exchange, Tag};

/// How a rule invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The rule returned an error.
    Failed,
    /// The rule panicked.
    Panicked,
    /// The whole conversation's worker died before producing tags.
    WorkerLost,
}

/// A rule failure, reported instead of propagated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleDiagnostic {
    /// Rule name (empty for worker failures).
    pub rule: String,
    /// Exchange or conversation label the rule ran against.
    pub unit: String,
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FailureKind::WorkerLost => write!(f, "{}: worker lost: {}", self.unit, self.message),
            _ => write!(f, "{} on {}: {}", self.rule, self.unit, self.message),
        }
    }
}

/// One exchange with its tags, as reported in a [`TaggingResult`].
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeResult {
    pub exchange: Exchange,
    pub tags: Vec<Tag>,
}

/// Everything downstream consumers need from one tagged conversation.
#[derive(Debug, Clone, Serialize)]
pub struct TaggingResult {
    pub conversation_id: String,
    pub title: String,
    pub tags: Vec<Tag>,
    pub exchanges: Vec<ExchangeResult>,
    pub exchange_count: usize,
    pub annotations: Annotations,
    /// Exchanges per annotation name (truthy values only).
    pub exchange_tag_counts: BTreeMap<String, usize>,
    pub diagnostics: Vec<RuleDiagnostic>,
}

impl TaggingResult {
    pub fn from_conversation(conversation: Conversation, diagnostics: Vec<RuleDiagnostic>) -> Self {
        let exchange_tag_counts = conversation.exchange_annotation_counts();
        let exchange_count = conversation.exchange_count();
        let exchanges = conversation
            .exchanges
            .into_iter()
            .map(|exchange| ExchangeResult {
                tags: exchange.tags.clone(),
                exchange,
            })
            .collect();

        Self {
            conversation_id: conversation.id,
            title: conversation.title,
            tags: conversation.tags,
            exchanges,
            exchange_count,
            annotations: conversation.annotations,
            exchange_tag_counts,
            diagnostics,
        }
    }

    /// Placeholder result for a conversation whose worker died.
    pub fn lost(conversation_id: impl Into<String>, title: impl Into<String>, reason: impl Into<String>) -> Self {
        let conversation_id = conversation_id.into();
        Self {
            diagnostics: vec![RuleDiagnostic {
                rule: String::new(),
                unit: conversation_id.clone(),
                kind: FailureKind::WorkerLost,
                message: reason.into(),
            }],
            conversation_id,
            title: title.into(),
            tags: Vec::new(),
            exchanges: Vec::new(),
            exchange_count: 0,
            annotations: Annotations::new(),
            exchange_tag_counts: BTreeMap::new(),
        }
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
