//! Parallel batch tagging.
//!
//! Conversations are independent, so each one runs on its own blocking
//! worker with the tagger (and its rule registries) shared read-only.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::adapters::RawConversation;
use crate::tagging::engine::ConversationTagger;
use crate::tagging::result::TaggingResult;

/// Runs a [`ConversationTagger`] over many conversations concurrently.
#[derive(Clone)]
pub struct BatchTagger {
    tagger: Arc<ConversationTagger>,
    max_parallel: usize,
}

impl BatchTagger {
    pub fn new(tagger: Arc<ConversationTagger>, max_parallel: usize) -> Self {
        Self {
            tagger,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn tagger(&self) -> &ConversationTagger {
        &self.tagger
    }

    /// Tag every conversation. Always returns one result per input, in
    /// input order, even when a worker dies.
    pub async fn tag_all(&self, conversations: Vec<RawConversation>) -> Vec<TaggingResult> {
        let total = conversations.len();

        let results: Vec<TaggingResult> = stream::iter(conversations)
            .map(|raw| {
                let tagger = Arc::clone(&self.tagger);
                async move {
                    let id = raw.id().to_string();
                    let title = raw.title().to_string();
                    match tokio::task::spawn_blocking(move || tagger.tag_conversation(&raw)).await {
                        Ok(result) => result,
                        Err(e) => {
                            error!(conversation_id = %id, error = %e, "Tagging worker failed");
                            TaggingResult::lost(id, title, e.to_string())
                        }
                    }
                }
            })
            .buffered(self.max_parallel)
            .collect()
            .await;

        let failures: usize = results.iter().map(|r| r.diagnostics.len()).sum();
        info!(
            conversations = total,
            exchanges = results.iter().map(|r| r.exchange_count).sum::<usize>(),
            rule_failures = failures,
            "Batch tagging complete"
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::model::{Conversation, Exchange};
    use crate::pipeline::{ConversationParser, NeverContinue};
    use crate::tagging::rule::RuleRegistry;
    use serde_json::json;

    fn flat(id: &str, texts: &[(&str, &str)]) -> RawConversation {
        let messages: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, (sender, text))| {
                json!({"uuid": format!("{}-{}", id, i), "sender": sender, "text": text})
            })
            .collect();
        RawConversation::from_value(json!({"uuid": id, "name": id, "chat_messages": messages}))
            .unwrap()
    }

    fn tagger() -> Arc<ConversationTagger> {
        let mut exchange_rules: RuleRegistry<Exchange> = RuleRegistry::new();
        exchange_rules
            .register_fn("picky", |e: &Exchange| {
                if e.user_text().contains("bad") {
                    Err(RuleError::failed("picky", "refuses bad input"))
                } else {
                    Ok(true.into())
                }
            })
            .unwrap();
        let mut conversation_rules: RuleRegistry<Conversation> = RuleRegistry::new();
        conversation_rules
            .register_predicate("working", |_: &Conversation| true)
            .unwrap();

        let parser = ConversationParser::builder()
            .continuation_policy(Box::new(NeverContinue))
            .build()
            .unwrap();
        Arc::new(ConversationTagger::new(
            parser,
            Arc::new(exchange_rules),
            Arc::new(conversation_rules),
        ))
    }

    #[tokio::test]
    async fn preserves_order_and_isolates_failures() {
        let batch = BatchTagger::new(tagger(), 2);
        let inputs = vec![
            flat("c1", &[("human", "good"), ("assistant", "ok")]),
            flat("c2", &[("human", "bad"), ("assistant", "ok")]),
            flat("c3", &[("human", "good"), ("assistant", "ok"), ("human", "bad")]),
        ];

        let results = batch.tag_all(inputs).await;

        let ids: Vec<_> = results.iter().map(|r| r.conversation_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(results.iter().all(|r| r.has_tag("working")));

        assert!(results[0].is_clean());
        assert_eq!(results[1].diagnostics.len(), 1);
        assert_eq!(results[1].diagnostics[0].unit, "c2#0");
        assert_eq!(results[2].exchange_count, 2);
        assert_eq!(results[2].diagnostics.len(), 1);
        assert_eq!(results[2].exchanges[0].tags.len(), 1);
        assert!(results[2].exchanges[1].tags.is_empty());
    }

    #[tokio::test]
    async fn empty_batch() {
        let batch = BatchTagger::new(tagger(), 0);
        assert!(batch.tag_all(Vec::new()).await.is_empty());
    }
}
