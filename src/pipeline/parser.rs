//! Raw conversation → [`Conversation`]: adapters, graph walk, grouping.

use std::sync::Arc;

use tracing::debug;

use crate::adapters::{ChatGptAdapter, ClaudeAdapter, MessageAdapter, RawConversation};
use crate::config::TaggerConfig;
use crate::error::ConfigError;
use crate::model::Conversation;
use crate::pipeline::branch::{BranchPolicy, LatestBranchPolicy};
use crate::pipeline::builder::ExchangeBuilder;
use crate::pipeline::continuation::ContinuationPolicy;
use crate::pipeline::graph::{GraphWalker, NodeArena};

/// Parses raw conversations into exchanges. Stateless across conversations.
pub struct ConversationParser {
    walker: GraphWalker,
    builder: ExchangeBuilder,
    tree_adapter: Arc<dyn MessageAdapter>,
    flat_adapter: Arc<dyn MessageAdapter>,
}

impl ConversationParser {
    pub fn builder() -> ConversationParserBuilder {
        ConversationParserBuilder::default()
    }

    /// Parser assembled from configured policy names.
    pub fn from_config(config: &TaggerConfig) -> Result<Self, ConfigError> {
        Self::builder()
            .branch_policy(config.branch_policy()?)
            .continuation_policy(config.continuation_policy()?)
            .build()
    }

    /// Build the node arena for a raw conversation.
    pub fn arena(&self, raw: &RawConversation) -> NodeArena {
        let nodes = match raw {
            RawConversation::Tree(tree) => tree.to_nodes(self.tree_adapter.as_ref()),
            RawConversation::Flat(flat) => flat.to_nodes(self.flat_adapter.as_ref()),
        };
        NodeArena::build(nodes)
    }

    pub fn parse(&self, raw: &RawConversation) -> Conversation {
        let arena = self.arena(raw);
        let path = self.walker.walk(&arena);
        let message_count = path.len();
        let exchanges = self.builder.build(raw.id(), path);

        debug!(
            conversation_id = %raw.id(),
            format = raw.format(),
            nodes = arena.len(),
            messages = message_count,
            exchanges = exchanges.len(),
            branch_policy = self.walker.policy_name(),
            continuation_policy = self.builder.policy_name(),
            "Parsed conversation"
        );

        Conversation::new(raw.id(), raw.title(), exchanges)
    }
}

/// Assembles a [`ConversationParser`]. A continuation policy is required.
#[derive(Default)]
pub struct ConversationParserBuilder {
    branch: Option<Box<dyn BranchPolicy>>,
    continuation: Option<Box<dyn ContinuationPolicy>>,
}

impl ConversationParserBuilder {
    pub fn branch_policy(mut self, policy: Box<dyn BranchPolicy>) -> Self {
        self.branch = Some(policy);
        self
    }

    pub fn continuation_policy(mut self, policy: Box<dyn ContinuationPolicy>) -> Self {
        self.continuation = Some(policy);
        self
    }

    pub fn build(self) -> Result<ConversationParser, ConfigError> {
        let continuation = self
            .continuation
            .ok_or(ConfigError::MissingContinuationPolicy)?;
        let branch = self
            .branch
            .unwrap_or_else(|| Box::new(LatestBranchPolicy::default()));

        Ok(ConversationParser {
            walker: GraphWalker::new(branch),
            builder: ExchangeBuilder::new(continuation),
            tree_adapter: Arc::new(ChatGptAdapter::new()),
            flat_adapter: Arc::new(ClaudeAdapter::new()),
        })
    }
}
