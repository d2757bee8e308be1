//! Data model: normalized messages, exchanges, conversations, tags.

pub mod annotation;
pub mod conversation;
pub mod exchange;
pub mod message;
pub mod tag;

pub use annotation::{Annotations, create_annotation, merge_annotations};
pub use conversation::Conversation;
pub use exchange::Exchange;
pub use message::{AuthorRole, NormalizedMessage};
pub use tag::Tag;

/// A unit that rules can annotate (an exchange or a conversation).
pub trait Annotated {
    /// Identifier used in logs and diagnostics.
    fn label(&self) -> String;

    fn annotations(&self) -> &Annotations;

    fn annotations_mut(&mut self) -> &mut Annotations;

    fn tags(&self) -> &[Tag];

    fn tags_mut(&mut self) -> &mut Vec<Tag>;

    /// Record a tag: writes `{name: attributes | true}` and keeps the tag,
    /// replacing any earlier tag of the same name.
    fn apply_tag(&mut self, tag: Tag) {
        self.annotations_mut()
            .insert(tag.name.clone(), tag.annotation_value());
        let tags = self.tags_mut();
        match tags.iter_mut().find(|t| t.name == tag.name) {
            Some(existing) => *existing = tag,
            None => tags.push(tag),
        }
    }

    fn has_tag(&self, name: &str) -> bool {
        self.tags().iter().any(|t| t == name)
    }
}
