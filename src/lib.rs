//! Chat Tagger: turns exported chat archives into tagged exchanges.

pub mod adapters;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod tagging;

pub use config::TaggerConfig;
pub use error::{AdapterError, ConfigError, ExportError, RuleError};
pub use model::{Conversation, Exchange, NormalizedMessage, Tag};
pub use tagging::{BatchTagger, ConversationTagger, TaggingResult};
