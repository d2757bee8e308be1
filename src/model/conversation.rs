//! Conversation: the ordered exchanges of one chat plus its own annotations.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::model::annotation::{Annotations, is_truthy};
use crate::model::exchange::Exchange;
use crate::model::message::NormalizedMessage;
use crate::model::tag::Tag;
use crate::model::Annotated;

/// A parsed conversation.
///
/// Concatenating every exchange's messages yields exactly the canonical
/// path the graph walker selected.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub exchanges: Vec<Exchange>,
    pub annotations: Annotations,
    pub tags: Vec<Tag>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, title: impl Into<String>, exchanges: Vec<Exchange>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            exchanges,
            annotations: Annotations::new(),
            tags: Vec::new(),
        }
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn total_message_count(&self) -> usize {
        self.exchanges.iter().map(Exchange::message_count).sum()
    }

    /// Messages in canonical path order.
    pub fn messages(&self) -> impl Iterator<Item = &NormalizedMessage> {
        self.exchanges.iter().flat_map(|e| e.messages().iter())
    }

    /// Number of exchanges carrying a truthy annotation under `name`.
    pub fn exchanges_with(&self, name: &str) -> usize {
        self.exchanges
            .iter()
            .filter(|e| e.has_annotation(name))
            .count()
    }

    /// Whether any exchange carries a truthy annotation under `name`.
    pub fn any_exchange_has(&self, name: &str) -> bool {
        self.exchanges.iter().any(|e| e.has_annotation(name))
    }

    /// Every exchange's value for `name`, skipping exchanges without it.
    pub fn exchange_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.exchanges.iter().filter_map(move |e| e.annotation(name))
    }

    /// Per-annotation count of exchanges carrying it (truthy only).
    pub fn exchange_annotation_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for exchange in &self.exchanges {
            for (name, value) in &exchange.annotations {
                if is_truthy(value) {
                    *counts.entry(name.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.get(name).is_some_and(is_truthy)
    }

    pub fn annotation(&self, name: &str) -> Option<&Value> {
        self.annotations.get(name)
    }
}

impl Annotated for Conversation {
    fn label(&self) -> String {
        self.id.clone()
    }

    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn tags_mut(&mut self) -> &mut Vec<Tag> {
        &mut self.tags
    }
}
