//! Conversation parsing pipeline.
//!
//! Every raw conversation flows through:
//! 1. `MessageAdapter::normalize()`: vendor record → normalized message
//! 2. `NodeArena::build()`: resolve parent/child links into a forest
//! 3. `GraphWalker::walk()`: select the canonical path through branches
//! 4. `ExchangeBuilder::build()`: group the path into exchanges
//!
//! The output `Conversation` covers every message on the canonical path
//! exactly once.

pub mod branch;
pub mod builder;
pub mod continuation;
pub mod graph;
pub mod parser;

pub use branch::{BranchPolicy, LastChildPolicy, LatestBranchPolicy, TieBreak};
pub use builder::ExchangeBuilder;
pub use continuation::{
    AlwaysContinue, ContinuationFn, ContinuationPolicy, NeverContinue, QuoteContinuation,
};
pub use graph::{GraphWalker, NodeArena, RawNode};
pub use parser::{ConversationParser, ConversationParserBuilder};
