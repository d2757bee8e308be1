//! Default rule catalog.
//!
//! Fast pattern rules, no external lookups. Thresholds are captured from
//! [`TaggerConfig`] when the registries are built.
//!
//! Exchange rules:
//! - `has_code` → fenced code blocks (attrs: `blocks`, `languages`)
//! - `has_question` → user asked a question
//! - `has_error_trace` → user pasted a stack trace or error line
//! - `has_links` → URLs anywhere in the exchange (attrs: `count`)
//! - `has_wiki_links` → `[[wiki link]]` syntax
//! - `long_prompt` → user text over the threshold (attrs: `chars`)
//! - `continued` → exchange absorbed a continuation
//!
//! Conversation rules:
//! - `multi_exchange`, `long_conversation` (attrs: `messages`),
//!   `code_heavy` (attrs: `ratio`), `has_continuations` (attrs: `count`),
//!   `unknown_roles` (attrs: `count`)

use std::sync::Arc;

use regex::Regex;

use crate::config::TaggerConfig;
use crate::error::ConfigError;
use crate::model::{Conversation, Exchange, Tag};
use crate::tagging::rule::{Rule, RuleOutcome, RuleRegistry, RuleResult};

/// Matches an opening or closing code fence, capturing the info string.
const CODE_FENCE: &str = r"(?m)^[ \t]*```[ \t]*([\w+#.\-]*)";

const ERROR_TRACE: &str = r"(?m)(Traceback \(most recent call last\)|^\s+at [\w$.<>]+\(.*\)\s*$|\b[A-Z]\w*(Error|Exception):\s|thread '.*' panicked at|^error(\[E\d+\])?: )";

const URL: &str = r#"https?://[^\s<>()\[\]"']+"#;

const WIKI_LINK: &str = r"\[\[[^\[\]\n]+\]\]";

/// Fenced code blocks across every message in the exchange.
pub struct CodeBlockRule {
    fence: Regex,
}

impl CodeBlockRule {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            fence: Regex::new(CODE_FENCE)?,
        })
    }
}

impl Rule<Exchange> for CodeBlockRule {
    fn name(&self) -> &str {
        "has_code"
    }

    fn description(&self) -> &str {
        "Exchange contains fenced code blocks"
    }

    fn evaluate(&self, exchange: &Exchange) -> RuleResult {
        let mut blocks = 0usize;
        let mut languages: Vec<String> = Vec::new();

        for message in exchange.messages() {
            // Fences alternate open/close within a message.
            for (i, caps) in self.fence.captures_iter(&message.text).enumerate() {
                if i % 2 != 0 {
                    continue;
                }
                blocks += 1;
                let lang = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
                if !lang.is_empty() && !languages.contains(&lang) {
                    languages.push(lang);
                }
            }
        }

        if blocks == 0 {
            return Ok(RuleOutcome::NoMatch);
        }
        Ok(Tag::new("has_code")
            .with("blocks", blocks)
            .with("languages", languages)
            .into())
    }
}

/// Regex over the exchange's user text, reported as a flag.
pub struct UserPatternRule {
    name: String,
    regex: Regex,
}

impl UserPatternRule {
    pub fn new(name: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            regex: Regex::new(pattern)?,
        })
    }
}

impl Rule<Exchange> for UserPatternRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, exchange: &Exchange) -> RuleResult {
        Ok(exchange
            .user_messages()
            .any(|m| self.regex.is_match(&m.text))
            .into())
    }
}

/// Build the default exchange rule registry.
pub fn exchange_rules(config: &TaggerConfig) -> Result<RuleRegistry<Exchange>, ConfigError> {
    let mut rules = RuleRegistry::new();

    rules.register(Arc::new(CodeBlockRule::new().map_err(invalid_pattern)?))?;

    rules.register_predicate("has_question", |e: &Exchange| {
        e.user_messages().any(|m| m.text.contains('?'))
    })?;

    rules.register(Arc::new(
        UserPatternRule::new("has_error_trace", ERROR_TRACE).map_err(invalid_pattern)?,
    ))?;

    let url = Regex::new(URL).map_err(invalid_pattern)?;
    rules.register_fn("has_links", move |e: &Exchange| {
        let count: usize = e
            .messages()
            .iter()
            .map(|m| url.find_iter(&m.text).count())
            .sum();
        Ok((count > 0)
            .then(|| Tag::new("has_links").with("count", count))
            .into())
    })?;

    let wiki = Regex::new(WIKI_LINK).map_err(invalid_pattern)?;
    rules.register_predicate("has_wiki_links", move |e: &Exchange| {
        e.messages().iter().any(|m| wiki.is_match(&m.text))
    })?;

    let threshold = config.long_prompt_chars;
    rules.register_fn("long_prompt", move |e: &Exchange| {
        let chars: usize = e.user_messages().map(|m| m.text.chars().count()).sum();
        Ok((chars >= threshold)
            .then(|| Tag::new("long_prompt").with("chars", chars))
            .into())
    })?;

    rules.register_predicate("continued", |e: &Exchange| e.continuation)?;

    Ok(rules)
}

/// Build the default conversation rule registry.
pub fn conversation_rules(
    config: &TaggerConfig,
) -> Result<RuleRegistry<Conversation>, ConfigError> {
    let mut rules = RuleRegistry::new();

    rules.register_predicate("multi_exchange", |c: &Conversation| c.exchange_count() > 1)?;

    let threshold = config.long_conversation_messages;
    rules.register_fn("long_conversation", move |c: &Conversation| {
        let messages = c.total_message_count();
        Ok((messages >= threshold)
            .then(|| Tag::new("long_conversation").with("messages", messages))
            .into())
    })?;

    let min_ratio = config.code_heavy_ratio;
    rules.register_fn("code_heavy", move |c: &Conversation| {
        if c.exchange_count() == 0 {
            return Ok(RuleOutcome::NoMatch);
        }
        let ratio = c.exchanges_with("has_code") as f64 / c.exchange_count() as f64;
        Ok((ratio > 0.0 && ratio >= min_ratio)
            .then(|| Tag::new("code_heavy").with("ratio", (ratio * 100.0).round() / 100.0))
            .into())
    })?;

    rules.register_fn("has_continuations", |c: &Conversation| {
        let count = c.exchanges.iter().filter(|e| e.continuation).count();
        Ok((count > 0)
            .then(|| Tag::new("has_continuations").with("count", count))
            .into())
    })?;

    rules.register_fn("unknown_roles", |c: &Conversation| {
        let count = c.messages().filter(|m| m.role.is_unknown()).count();
        Ok((count > 0)
            .then(|| Tag::new("unknown_roles").with("count", count))
            .into())
    })?;

    Ok(rules)
}

fn invalid_pattern(e: regex::Error) -> ConfigError {
    ConfigError::InvalidValue {
        key: "rule pattern".into(),
        message: e.to_string(),
    }
}
