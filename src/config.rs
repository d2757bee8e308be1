//! Configuration types.

use crate::error::ConfigError;
use crate::pipeline::branch::{self, BranchPolicy, TieBreak};
use crate::pipeline::continuation::{self, ContinuationPolicy, QuoteContinuation};

/// Tagger configuration.
#[derive(Debug, Clone)]
pub struct TaggerConfig {
    /// Continuation policy name: `quote`, `never`, or `always`.
    pub continuation_policy: String,
    /// Minimum blockquote length (chars) that counts as quoting.
    pub min_quote_chars: usize,
    /// Shared consecutive words that count as quoting (0 disables).
    pub min_shared_words: usize,
    /// Branch policy name: `latest` or `last-child`.
    pub branch_policy: String,
    /// Tie-break for the `latest` policy: `first`, `last`, or `deepest`.
    pub branch_tie_break: String,
    /// User text length that marks a long prompt.
    pub long_prompt_chars: usize,
    /// Message count that marks a long conversation.
    pub long_conversation_messages: usize,
    /// Share of code-bearing exchanges that marks a code-heavy conversation.
    pub code_heavy_ratio: f64,
    /// Conversations tagged concurrently in a batch.
    pub max_parallel: usize,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            continuation_policy: "quote".to_string(),
            min_quote_chars: 12,
            min_shared_words: 8,
            branch_policy: "latest".to_string(),
            branch_tie_break: "first".to_string(),
            long_prompt_chars: 2000,
            long_conversation_messages: 40,
            code_heavy_ratio: 0.5,
            max_parallel: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl TaggerConfig {
    /// Defaults overridden by `CHAT_TAGGER_*` environment variables.
    /// Unparseable numbers fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let continuation_policy = std::env::var("CHAT_TAGGER_CONTINUATION")
            .unwrap_or(defaults.continuation_policy);
        let min_quote_chars = env_parse("CHAT_TAGGER_MIN_QUOTE_CHARS", defaults.min_quote_chars);
        let min_shared_words = env_parse("CHAT_TAGGER_MIN_SHARED_WORDS", defaults.min_shared_words);
        let branch_policy =
            std::env::var("CHAT_TAGGER_BRANCH_POLICY").unwrap_or(defaults.branch_policy);
        let branch_tie_break =
            std::env::var("CHAT_TAGGER_BRANCH_TIE_BREAK").unwrap_or(defaults.branch_tie_break);
        let long_prompt_chars =
            env_parse("CHAT_TAGGER_LONG_PROMPT_CHARS", defaults.long_prompt_chars);
        let long_conversation_messages = env_parse(
            "CHAT_TAGGER_LONG_CONVERSATION_MESSAGES",
            defaults.long_conversation_messages,
        );
        let code_heavy_ratio = env_parse("CHAT_TAGGER_CODE_HEAVY_RATIO", defaults.code_heavy_ratio);
        let max_parallel = env_parse("CHAT_TAGGER_MAX_PARALLEL", defaults.max_parallel);

        Self {
            continuation_policy,
            min_quote_chars,
            min_shared_words,
            branch_policy,
            branch_tie_break,
            long_prompt_chars,
            long_conversation_messages,
            code_heavy_ratio,
            max_parallel,
        }
    }

    /// Reject values that cannot work, before any conversation is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_parallel".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.code_heavy_ratio) {
            return Err(ConfigError::InvalidValue {
                key: "code_heavy_ratio".into(),
                message: format!("{} is outside 0.0..=1.0", self.code_heavy_ratio),
            });
        }
        self.branch_policy()?;
        self.continuation_policy()?;
        Ok(())
    }

    pub fn branch_policy(&self) -> Result<Box<dyn BranchPolicy>, ConfigError> {
        let tie_break: TieBreak = self.branch_tie_break.parse()?;
        branch::policy_from_name(&self.branch_policy, tie_break)
    }

    pub fn continuation_policy(&self) -> Result<Box<dyn ContinuationPolicy>, ConfigError> {
        continuation::policy_from_name(
            &self.continuation_policy,
            QuoteContinuation {
                min_quote_chars: self.min_quote_chars,
                min_shared_words: self.min_shared_words,
            },
        )
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TaggerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.max_parallel >= 1);
        assert_eq!(config.branch_policy().unwrap().name(), "latest");
        assert_eq!(config.continuation_policy().unwrap().name(), "quote");
    }

    #[test]
    fn unknown_policy_names_are_rejected() {
        let config = TaggerConfig {
            continuation_policy: "telepathy".into(),
            ..TaggerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownPolicy { kind: "continuation", .. })
        ));

        let config = TaggerConfig {
            branch_tie_break: "coin-flip".into(),
            ..TaggerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownPolicy { kind: "tie-break", .. })
        ));
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let config = TaggerConfig {
            max_parallel: 0,
            ..TaggerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn ratio_out_of_range_is_rejected() {
        let config = TaggerConfig {
            code_heavy_ratio: 1.5,
            ..TaggerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
