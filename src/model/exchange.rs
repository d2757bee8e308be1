//! Exchange: one analytical unit of a conversation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::model::annotation::{Annotations, is_truthy};
use crate::model::message::NormalizedMessage;
use crate::model::tag::Tag;
use crate::model::Annotated;

/// One or more adjacent user/assistant turns judged topically continuous.
///
/// The message grouping is fixed once the builder emits the exchange; only
/// the annotation store and tag list change afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub conversation_id: String,
    /// Position within the conversation, starting at 0.
    pub index: usize,
    messages: Vec<NormalizedMessage>,
    /// True iff this exchange absorbed at least one user turn through the
    /// continuation policy.
    pub continuation: bool,
    pub annotations: Annotations,
    pub tags: Vec<Tag>,
}

impl Exchange {
    /// Start an exchange from its first message.
    pub fn new(conversation_id: impl Into<String>, index: usize, first: NormalizedMessage) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            index,
            messages: vec![first],
            continuation: false,
            annotations: Annotations::new(),
            tags: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, message: NormalizedMessage) {
        self.messages.push(message);
    }

    /// `<conversation_id>#<index>`, used in logs and diagnostics.
    pub fn id(&self) -> String {
        format!("{}#{}", self.conversation_id, self.index)
    }

    pub fn messages(&self) -> &[NormalizedMessage] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn user_messages(&self) -> impl Iterator<Item = &NormalizedMessage> {
        self.messages.iter().filter(|m| m.is_user())
    }

    pub fn assistant_messages(&self) -> impl Iterator<Item = &NormalizedMessage> {
        self.messages.iter().filter(|m| m.is_assistant())
    }

    /// All user text, joined with blank lines.
    pub fn user_text(&self) -> String {
        join_text(self.user_messages())
    }

    /// All assistant text, joined with blank lines.
    pub fn assistant_text(&self) -> String {
        join_text(self.assistant_messages())
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.messages.first().and_then(|m| m.created_at)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().rev().find_map(|m| m.created_at)
    }

    /// Number of user turns grouped into this exchange.
    pub fn user_turns(&self) -> usize {
        self.user_messages().count()
    }
}

impl Annotated for Exchange {
    fn label(&self) -> String {
        self.id()
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

impl Exchange {
    /// Whether the annotation is present and truthy.
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.get(name).is_some_and(is_truthy)
    }

    pub fn annotation(&self, name: &str) -> Option<&Value> {
        self.annotations.get(name)
    }
}

fn join_text<'a>(messages: impl Iterator<Item = &'a NormalizedMessage>) -> String {
    messages
        .map(|m| m.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::AuthorRole;
    use chrono::TimeZone;

    fn make_message(id: &str, role: AuthorRole, text: &str, secs: i64) -> NormalizedMessage {
        NormalizedMessage::new(id, role, text, Some(Utc.timestamp_opt(secs, 0).unwrap()))
    }

    #[test]
    fn text_accessors_split_by_role() {
        let mut ex = Exchange::new("c1", 0, make_message("m1", AuthorRole::User, "hi", 1));
        ex.push(make_message("m2", AuthorRole::Assistant, "hello", 2));
        ex.push(make_message("m3", AuthorRole::User, "again", 3));

        assert_eq!(ex.user_text(), "hi\n\nagain");
        assert_eq!(ex.assistant_text(), "hello");
        assert_eq!(ex.user_turns(), 2);
        assert_eq!(ex.message_count(), 3);
        assert_eq!(ex.id(), "c1#0");
    }

    #[test]
    fn time_bounds() {
        let mut ex = Exchange::new("c1", 0, make_message("m1", AuthorRole::User, "hi", 10));
        ex.push(NormalizedMessage::new("m2", AuthorRole::Assistant, "x", None));
        assert_eq!(ex.started_at(), Some(Utc.timestamp_opt(10, 0).unwrap()));
        assert_eq!(ex.ended_at(), Some(Utc.timestamp_opt(10, 0).unwrap()));
    }

    #[test]
    fn applying_same_tag_twice_replaces() {
        let mut ex = Exchange::new("c1", 0, make_message("m1", AuthorRole::User, "hi", 1));
        ex.apply_tag(Tag::new("long_prompt").with("chars", 10));
        ex.apply_tag(Tag::new("long_prompt").with("chars", 12));

        assert_eq!(ex.tags.len(), 1);
        assert_eq!(ex.annotation("long_prompt").unwrap()["chars"], 12);
        assert!(ex.has_annotation("long_prompt"));
        assert!(!ex.has_annotation("missing"));
    }
}
