//! Rules and the rule registry.

use std::sync::Arc;

use tracing::debug;

use crate::error::{ConfigError, RuleError};
use crate::model::Tag;

/// What a rule reports for one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// Nothing recorded.
    NoMatch,
    /// Records `{rule_name: true}`.
    Flag,
    /// Records `{tag.name: attributes | true}` and keeps the tag.
    Tagged(Tag),
}

impl From<bool> for RuleOutcome {
    fn from(matched: bool) -> Self {
        if matched { Self::Flag } else { Self::NoMatch }
    }
}

impl From<Tag> for RuleOutcome {
    fn from(tag: Tag) -> Self {
        Self::Tagged(tag)
    }
}

impl From<Option<Tag>> for RuleOutcome {
    fn from(tag: Option<Tag>) -> Self {
        tag.map_or(Self::NoMatch, Self::Tagged)
    }
}

pub type RuleResult = Result<RuleOutcome, RuleError>;

/// A named classification rule over units of type `U`.
///
/// Rules only read the unit. Anything external they need is captured
/// when the rule is constructed, never fetched during evaluation.
pub trait Rule<U>: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn evaluate(&self, unit: &U) -> RuleResult;
}

/// Adapts a closure into a named rule.
pub struct FnRule<F> {
    name: String,
    description: String,
    f: F,
}

impl<F> FnRule<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            f,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<U, F> Rule<U> for FnRule<F>
where
    F: Fn(&U) -> RuleResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn evaluate(&self, unit: &U) -> RuleResult {
        (self.f)(unit)
    }
}

/// Ordered registry of rules with unique names.
///
/// Populated once at startup, then shared read-only (`Arc`) by every
/// tagging run.
pub struct RuleRegistry<U> {
    rules: Vec<Arc<dyn Rule<U>>>,
}

impl<U> Default for RuleRegistry<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> RuleRegistry<U> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule. Duplicate names are a setup error.
    pub fn register(&mut self, rule: Arc<dyn Rule<U>>) -> Result<(), ConfigError> {
        let name = rule.name().to_string();
        if self.contains(&name) {
            return Err(ConfigError::DuplicateRule { name });
        }
        debug!(rule = %name, description = rule.description(), "Registered rule");
        self.rules.push(rule);
        Ok(())
    }

    /// Register a closure returning a full [`RuleResult`].
    pub fn register_fn<F>(&mut self, name: &str, f: F) -> Result<(), ConfigError>
    where
        F: Fn(&U) -> RuleResult + Send + Sync + 'static,
        U: 'static,
    {
        self.register(Arc::new(FnRule::new(name, f)))
    }

    /// Register an infallible boolean predicate.
    pub fn register_predicate<F>(&mut self, name: &str, f: F) -> Result<(), ConfigError>
    where
        F: Fn(&U) -> bool + Send + Sync + 'static,
        U: 'static,
    {
        self.register_fn(name, move |unit: &U| Ok(f(unit).into()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule<U>>> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LenRule;

    impl Rule<String> for LenRule {
        fn name(&self) -> &str {
            "long"
        }
        fn evaluate(&self, unit: &String) -> RuleResult {
            Ok((unit.len() > 3).into())
        }
    }

    #[test]
    fn outcome_conversions() {
        assert_eq!(RuleOutcome::from(true), RuleOutcome::Flag);
        assert_eq!(RuleOutcome::from(false), RuleOutcome::NoMatch);
        assert_eq!(RuleOutcome::from(None::<Tag>), RuleOutcome::NoMatch);
        assert_eq!(
            RuleOutcome::from(Tag::new("x")),
            RuleOutcome::Tagged(Tag::new("x"))
        );
    }

    #[test]
    fn registers_in_order() {
        let mut registry: RuleRegistry<String> = RuleRegistry::new();
        registry.register(Arc::new(LenRule)).unwrap();
        registry.register_predicate("empty", |s: &String| s.is_empty()).unwrap();
        registry
            .register_fn("fails", |_: &String| Err(RuleError::failed("fails", "nope")))
            .unwrap();

        assert_eq!(registry.names(), vec!["long", "empty", "fails"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("empty"));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry: RuleRegistry<String> = RuleRegistry::new();
        registry.register_predicate("dup", |_: &String| true).unwrap();
        let err = registry.register_predicate("dup", |_: &String| false).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRule { ref name } if name == "dup"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn fn_rule_description() {
        let rule = FnRule::new("d", |_: &String| Ok(RuleOutcome::NoMatch))
            .with_description("does nothing");
        assert_eq!(Rule::<String>::description(&rule), "does nothing");
        assert_eq!(Rule::<String>::evaluate(&rule, &"x".to_string()).unwrap(), RuleOutcome::NoMatch);
    }
}
