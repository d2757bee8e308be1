//! Continuation policies: decide whether a new user turn extends the
//! current exchange or starts a new one.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::model::{Exchange, NormalizedMessage};

/// Decides continuity at an assistant → user boundary.
pub trait ContinuationPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// `true` extends `prior` with `candidate`; `false` closes `prior`.
    fn continues(&self, prior: &Exchange, candidate: &NormalizedMessage) -> bool;
}

/// Treats a user turn as continuous when it quotes or reuses a verbatim
/// span of the prior exchange's assistant text.
///
/// Two signals, either suffices:
/// - a markdown blockquote (`> ...`) of at least `min_quote_chars`
///   characters found in the assistant text (whitespace/case-insensitive);
/// - a run of `min_shared_words` consecutive words shared with the
///   assistant text. Zero disables this check.
#[derive(Debug, Clone, Copy)]
pub struct QuoteContinuation {
    pub min_quote_chars: usize,
    pub min_shared_words: usize,
}

impl Default for QuoteContinuation {
    fn default() -> Self {
        Self {
            min_quote_chars: 12,
            min_shared_words: 8,
        }
    }
}

impl ContinuationPolicy for QuoteContinuation {
    fn name(&self) -> &str {
        "quote"
    }

    fn continues(&self, prior: &Exchange, candidate: &NormalizedMessage) -> bool {
        let reference = normalize(&prior.assistant_text());
        if reference.is_empty() {
            return false;
        }

        let quoted = quote_blocks(&candidate.text).into_iter().any(|block| {
            let block = normalize(&block);
            block.chars().count() >= self.min_quote_chars.max(1) && reference.contains(&block)
        });
        if quoted {
            return true;
        }

        if self.min_shared_words == 0 {
            return false;
        }
        let reference_windows = word_windows(&reference, self.min_shared_words);
        if reference_windows.is_empty() {
            return false;
        }
        word_windows(&normalize(&candidate.text), self.min_shared_words)
            .iter()
            .any(|w| reference_windows.contains(w))
    }
}

/// Every user turn starts a new exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverContinue;

impl ContinuationPolicy for NeverContinue {
    fn name(&self) -> &str {
        "never"
    }

    fn continues(&self, _prior: &Exchange, _candidate: &NormalizedMessage) -> bool {
        false
    }
}

/// The whole conversation is one exchange.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl ContinuationPolicy for AlwaysContinue {
    fn name(&self) -> &str {
        "always"
    }

    fn continues(&self, _prior: &Exchange, _candidate: &NormalizedMessage) -> bool {
        true
    }
}

/// Adapts a closure into a named continuation policy.
pub struct ContinuationFn<F> {
    name: String,
    f: F,
}

impl<F> ContinuationFn<F>
where
    F: Fn(&Exchange, &NormalizedMessage) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ContinuationPolicy for ContinuationFn<F>
where
    F: Fn(&Exchange, &NormalizedMessage) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn continues(&self, prior: &Exchange, candidate: &NormalizedMessage) -> bool {
        (self.f)(prior, candidate)
    }
}

/// Resolve a continuation policy by its configured name.
pub fn policy_from_name(
    name: &str,
    quote: QuoteContinuation,
) -> Result<Box<dyn ContinuationPolicy>, ConfigError> {
    match name {
        "quote" => Ok(Box::new(quote)),
        "never" => Ok(Box::new(NeverContinue)),
        "always" => Ok(Box::new(AlwaysContinue)),
        _ => Err(ConfigError::UnknownPolicy {
            kind: "continuation",
            name: name.to_string(),
        }),
    }
}

/// Lowercase and collapse whitespace.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Consecutive `>`-prefixed lines, markers stripped, one string per block.
fn quote_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        match line.trim_start().strip_prefix('>') {
            Some(rest) => current.push(rest.trim_start_matches('>').trim()),
            None if !current.is_empty() => {
                blocks.push(current.join(" "));
                current.clear();
            }
            None => {}
        }
    }
    if !current.is_empty() {
        blocks.push(current.join(" "));
    }
    blocks
}

fn word_windows(text: &str, size: usize) -> HashSet<String> {
    let words: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() < size {
        return HashSet::new();
    }
    words.windows(size).map(|w| w.join(" ")).collect()
}
