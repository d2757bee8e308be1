//! Rule evaluation over exchanges and conversations.
//!
//! Each rule runs inside its own failure boundary: an `Err` return or a
//! panic becomes a [`RuleDiagnostic`] for that rule and unit only. Other
//! rules on the same unit, and every other unit, are unaffected.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::adapters::RawConversation;
use crate::config::TaggerConfig;
use crate::error::ConfigError;
use crate::model::{Annotated, Conversation, Exchange, Tag};
use crate::pipeline::ConversationParser;
use crate::tagging::builtin;
use crate::tagging::result::{FailureKind, RuleDiagnostic, TaggingResult};
use crate::tagging::rule::{RuleOutcome, RuleRegistry};

/// Run every rule against `unit`, then record the outcomes.
///
/// Rules all see the unit as it was before this pass, so registration
/// order never changes what a rule observes.
pub fn tag_unit<U: Annotated>(rules: &RuleRegistry<U>, unit: &mut U) -> Vec<RuleDiagnostic> {
    let label = unit.label();
    let mut outcomes: Vec<(String, RuleOutcome)> = Vec::with_capacity(rules.len());
    let mut diagnostics = Vec::new();

    {
        let view: &U = unit;
        for rule in rules.iter() {
            let name = rule.name();
            let result = panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(view)));
            let (kind, message) = match result {
                Ok(Ok(outcome)) => {
                    outcomes.push((name.to_string(), outcome));
                    continue;
                }
                Ok(Err(e)) => (FailureKind::Failed, e.to_string()),
                Err(payload) => (FailureKind::Panicked, panic_message(payload.as_ref())),
            };
            warn!(rule = %name, unit = %label, error = %message, "Rule failed, skipping");
            diagnostics.push(RuleDiagnostic {
                rule: name.to_string(),
                unit: label.clone(),
                kind,
                message,
            });
        }
    }

    for (name, outcome) in outcomes {
        match outcome {
            RuleOutcome::NoMatch => {}
            RuleOutcome::Flag => unit.apply_tag(Tag::new(name)),
            RuleOutcome::Tagged(tag) => unit.apply_tag(tag),
        }
    }

    diagnostics
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

/// Applies exchange-level rules.
#[derive(Clone)]
pub struct ExchangeTagger {
    rules: Arc<RuleRegistry<Exchange>>,
}

impl ExchangeTagger {
    pub fn new(rules: Arc<RuleRegistry<Exchange>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleRegistry<Exchange> {
        &self.rules
    }

    pub fn tag_exchange(&self, exchange: &mut Exchange) -> Vec<RuleDiagnostic> {
        tag_unit(&self.rules, exchange)
    }
}

/// Parses raw conversations, tags their exchanges, then tags the
/// conversation as a whole.
pub struct ConversationTagger {
    parser: ConversationParser,
    exchange_tagger: ExchangeTagger,
    rules: Arc<RuleRegistry<Conversation>>,
}

impl ConversationTagger {
    pub fn new(
        parser: ConversationParser,
        exchange_rules: Arc<RuleRegistry<Exchange>>,
        conversation_rules: Arc<RuleRegistry<Conversation>>,
    ) -> Self {
        Self {
            parser,
            exchange_tagger: ExchangeTagger::new(exchange_rules),
            rules: conversation_rules,
        }
    }

    /// Tagger with the configured policies and the default rule catalog.
    pub fn from_config(config: &TaggerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            ConversationParser::from_config(config)?,
            Arc::new(builtin::exchange_rules(config)?),
            Arc::new(builtin::conversation_rules(config)?),
        ))
    }

    pub fn parser(&self) -> &ConversationParser {
        &self.parser
    }

    pub fn exchange_tagger(&self) -> &ExchangeTagger {
        &self.exchange_tagger
    }

    pub fn conversation_rules(&self) -> &RuleRegistry<Conversation> {
        &self.rules
    }

    /// Parse and tag one raw conversation. Never fails: rule failures are
    /// returned as diagnostics on the result.
    pub fn tag_conversation(&self, raw: &RawConversation) -> TaggingResult {
        let mut conversation = self.parser.parse(raw);
        let diagnostics = self.retag(&mut conversation);
        TaggingResult::from_conversation(conversation, diagnostics)
    }

    /// Run all rules over an already-built conversation. Values under
    /// existing keys are overwritten; same-named tags are replaced.
    pub fn retag(&self, conversation: &mut Conversation) -> Vec<RuleDiagnostic> {
        let mut diagnostics = Vec::new();
        for exchange in &mut conversation.exchanges {
            diagnostics.extend(self.exchange_tagger.tag_exchange(exchange));
        }

        debug!(
            conversation_id = %conversation.id,
            exchanges = conversation.exchange_count(),
            tagged = conversation.exchanges.iter().filter(|e| !e.tags.is_empty()).count(),
            exchange_failures = diagnostics.len(),
            "Exchange tagging complete"
        );

        diagnostics.extend(tag_unit(&self.rules, conversation));
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::model::{AuthorRole, NormalizedMessage};
    use crate::pipeline::NeverContinue;
    use serde_json::json;

    fn exchange(text: &str) -> Exchange {
        Exchange::new(
            "c1",
            0,
            NormalizedMessage::new("m1", AuthorRole::User, text, None),
        )
    }

    fn raw_tree() -> RawConversation {
        RawConversation::from_value(json!({
            "conversation_id": "c1",
            "title": "Test",
            "mapping": {
                "root": {"id": "root", "message": null, "parent": null, "children": ["u1"]},
                "u1": {
                    "id": "u1",
                    "message": {"id": "u1", "author": {"role": "user"}, "create_time": 1.0,
                                "content": {"parts": ["Hello?"]}},
                    "parent": "root", "children": ["a1"]
                },
                "a1": {
                    "id": "a1",
                    "message": {"id": "a1", "author": {"role": "assistant"}, "create_time": 2.0,
                                "content": {"parts": ["Hi."]}},
                    "parent": "u1", "children": []
                }
            }
        }))
        .unwrap()
    }

    fn parser() -> ConversationParser {
        ConversationParser::builder()
            .continuation_policy(Box::new(NeverContinue))
            .build()
            .unwrap()
    }

    #[test]
    fn flag_tagged_and_no_match() {
        let mut rules: RuleRegistry<Exchange> = RuleRegistry::new();
        rules.register_predicate("always", |_: &Exchange| true).unwrap();
        rules.register_predicate("never", |_: &Exchange| false).unwrap();
        rules
            .register_fn("sized", |e: &Exchange| {
                Ok(Tag::new("size").with("chars", e.user_text().len()).into())
            })
            .unwrap();

        let mut ex = exchange("hello");
        let diagnostics = tag_unit(&rules, &mut ex);

        assert!(diagnostics.is_empty());
        assert_eq!(ex.annotation("always"), Some(&json!(true)));
        assert!(ex.annotation("never").is_none());
        assert!(ex.annotation("sized").is_none());
        assert_eq!(ex.annotation("size"), Some(&json!({"chars": 5})));
        assert!(ex.has_tag("always"));
        assert!(ex.has_tag("size"));
        assert_eq!(ex.tags.len(), 2);
    }

    #[test]
    fn failing_and_panicking_rules_are_isolated() {
        let mut rules: RuleRegistry<Exchange> = RuleRegistry::new();
        rules
            .register_fn("broken", |_: &Exchange| Err(RuleError::failed("broken", "boom")))
            .unwrap();
        rules
            .register_predicate("panics", |_: &Exchange| panic!("kaboom"))
            .unwrap();
        rules.register_predicate("working", |_: &Exchange| true).unwrap();

        let mut ex = exchange("hello");
        let diagnostics = tag_unit(&rules, &mut ex);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].rule, "broken");
        assert_eq!(diagnostics[0].kind, FailureKind::Failed);
        assert_eq!(diagnostics[1].rule, "panics");
        assert_eq!(diagnostics[1].kind, FailureKind::Panicked);
        assert_eq!(diagnostics[1].message, "kaboom");
        assert_eq!(diagnostics[1].unit, "c1#0");

        assert!(ex.has_tag("working"));
        assert!(!ex.has_tag("broken"));
        assert!(!ex.has_tag("panics"));
        assert_eq!(ex.annotations.len(), 1);
    }

    #[test]
    fn conversation_rules_see_exchange_annotations() {
        let mut exchange_rules: RuleRegistry<Exchange> = RuleRegistry::new();
        exchange_rules
            .register_predicate("asks", |e: &Exchange| e.user_text().contains('?'))
            .unwrap();
        let mut conversation_rules: RuleRegistry<Conversation> = RuleRegistry::new();
        conversation_rules
            .register_fn("inquisitive", |c: &Conversation| {
                Ok(RuleOutcome::from(c.any_exchange_has("asks")))
            })
            .unwrap();

        let tagger = ConversationTagger::new(
            parser(),
            Arc::new(exchange_rules),
            Arc::new(conversation_rules),
        );
        let result = tagger.tag_conversation(&raw_tree());

        assert_eq!(result.conversation_id, "c1");
        assert_eq!(result.exchange_count, 1);
        assert!(result.has_tag("inquisitive"));
        assert_eq!(result.exchanges[0].tags, vec![Tag::new("asks")]);
        assert_eq!(result.exchange_tag_counts.get("asks"), Some(&1));
        assert!(result.is_clean());
    }

    #[test]
    fn broken_conversation_rule_does_not_hide_working_one() {
        let mut conversation_rules: RuleRegistry<Conversation> = RuleRegistry::new();
        conversation_rules
            .register_fn("broken", |_: &Conversation| Err(RuleError::failed("broken", "always fails")))
            .unwrap();
        conversation_rules
            .register_predicate("working", |_: &Conversation| true)
            .unwrap();

        let tagger = ConversationTagger::new(
            parser(),
            Arc::new(RuleRegistry::new()),
            Arc::new(conversation_rules),
        );
        let result = tagger.tag_conversation(&raw_tree());

        assert!(result.has_tag("working"));
        assert!(!result.has_tag("broken"));
        assert!(!result.annotations.contains_key("broken"));
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn retagging_overwrites_without_duplicates() {
        let mut exchange_rules: RuleRegistry<Exchange> = RuleRegistry::new();
        exchange_rules.register_predicate("flag", |_: &Exchange| true).unwrap();
        let mut conversation_rules: RuleRegistry<Conversation> = RuleRegistry::new();
        conversation_rules
            .register_fn("count", |c: &Conversation| {
                Ok(Tag::new("count").with("n", c.exchange_count()).into())
            })
            .unwrap();

        let tagger = ConversationTagger::new(
            parser(),
            Arc::new(exchange_rules),
            Arc::new(conversation_rules),
        );
        let mut conversation = tagger.parser().parse(&raw_tree());
        tagger.retag(&mut conversation);
        tagger.retag(&mut conversation);

        assert_eq!(conversation.tags.len(), 1);
        assert_eq!(conversation.annotations.len(), 1);
        assert_eq!(conversation.exchanges[0].tags.len(), 1);
        assert_eq!(conversation.annotation("count"), Some(&json!({"n": 1})));
    }

    #[test]
    fn default_config_builds_tagger() {
        let tagger = ConversationTagger::from_config(&TaggerConfig::default()).unwrap();
        assert!(!tagger.exchange_tagger().rules().is_empty());
        assert!(!tagger.conversation_rules().is_empty());
    }
}
