//! Rule engine: evaluates named rules over exchanges and conversations.
//!
//! Flow per conversation:
//! 1. `ConversationParser::parse()`: canonical path → exchanges
//! 2. `ExchangeTagger::tag_exchange()`: exchange rules, per exchange
//! 3. `ConversationTagger::retag()`: conversation rules over the
//!    assembled conversation and its exchange annotations
//!
//! Rule failures never escape a tagging call; they come back as
//! diagnostics on the [`TaggingResult`].

pub mod batch;
pub mod builtin;
pub mod engine;
pub mod result;
pub mod rule;

pub use batch::BatchTagger;
pub use engine::{ConversationTagger, ExchangeTagger, tag_unit};
pub use result::{ExchangeResult, FailureKind, RuleDiagnostic, TaggingResult};
pub use rule::{FnRule, Rule, RuleOutcome, RuleRegistry, RuleResult};
