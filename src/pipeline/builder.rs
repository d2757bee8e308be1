//! Groups the canonical message path into exchanges.

use tracing::debug;

use crate::model::{AuthorRole, Exchange, NormalizedMessage};
use crate::pipeline::continuation::ContinuationPolicy;

/// Builds ordered [`Exchange`] units from a linear message sequence.
///
/// A candidate boundary is a user message arriving after at least one
/// assistant message in the current exchange. The continuation policy
/// decides whether the boundary extends the exchange (marking it as a
/// continuation) or closes it. System, tool, and unknown-role messages
/// never open a boundary; they join whatever exchange is current.
pub struct ExchangeBuilder {
    policy: Box<dyn ContinuationPolicy>,
}

impl ExchangeBuilder {
    pub fn new(policy: Box<dyn ContinuationPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Every input message lands in exactly one exchange, in input order.
    pub fn build(&self, conversation_id: &str, messages: Vec<NormalizedMessage>) -> Vec<Exchange> {
        let mut exchanges: Vec<Exchange> = Vec::new();
        let mut current: Option<Exchange> = None;
        let mut assistant_since_user = false;

        for message in messages {
            let role = message.role.clone();

            current = Some(match current.take() {
                None => Exchange::new(conversation_id, 0, message),
                Some(mut exchange) => {
                    if role == AuthorRole::User && assistant_since_user {
                        if self.policy.continues(&exchange, &message) {
                            debug!(
                                exchange = %exchange.id(),
                                message = %message.id,
                                policy = self.policy.name(),
                                "User turn continues exchange"
                            );
                            exchange.continuation = true;
                            exchange.push(message);
                            exchange
                        } else {
                            let index = exchanges.len() + 1;
                            exchanges.push(exchange);
                            Exchange::new(conversation_id, index, message)
                        }
                    } else {
                        exchange.push(message);
                        exchange
                    }
                }
            });

            match role {
                AuthorRole::User => assistant_since_user = false,
                AuthorRole::Assistant => assistant_since_user = true,
                _ => {}
            }
        }

        exchanges.extend(current);
        exchanges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::continuation::{AlwaysContinue, NeverContinue, QuoteContinuation};

    fn msg(id: &str, role: AuthorRole, text: &str) -> NormalizedMessage {
        NormalizedMessage::new(id, role, text, None)
    }

    fn ids(exchanges: &[Exchange]) -> Vec<Vec<&str>> {
        exchanges
            .iter()
            .map(|e| e.messages().iter().map(|m| m.id.as_str()).collect())
            .collect()
    }

    fn alternating() -> Vec<NormalizedMessage> {
        vec![
            msg("u1", AuthorRole::User, "What is the capital of France?"),
            msg("a1", AuthorRole::Assistant, "The capital of France is Paris."),
            msg("u2", AuthorRole::User, "And Germany?"),
            msg("a2", AuthorRole::Assistant, "Berlin."),
        ]
    }

    #[test]
    fn splits_on_each_user_turn_when_never_continuing() {
        let builder = ExchangeBuilder::new(Box::new(NeverContinue));
        let exchanges = builder.build("c1", alternating());
        assert_eq!(ids(&exchanges), vec![vec!["u1", "a1"], vec!["u2", "a2"]]);
        assert!(exchanges.iter().all(|e| !e.continuation));
        assert_eq!(exchanges[1].index, 1);
        assert_eq!(exchanges[1].conversation_id, "c1");
    }

    #[test]
    fn always_continue_yields_single_exchange() {
        let builder = ExchangeBuilder::new(Box::new(AlwaysContinue));
        let exchanges = builder.build("c1", alternating());
        assert_eq!(exchanges.len(), 1);
        assert!(exchanges[0].continuation);
        assert_eq!(exchanges[0].message_count(), 4);
    }

    #[test]
    fn quoting_user_turn_is_absorbed() {
        let mut messages = alternating();
        messages[2] = msg("u2", AuthorRole::User, "> The capital of France is Paris.\nWhy?");
        let builder = ExchangeBuilder::new(Box::new(QuoteContinuation::default()));
        let exchanges = builder.build("c1", messages);
        assert_eq!(exchanges.len(), 1);
        assert!(exchanges[0].continuation);
    }

    #[test]
    fn consecutive_user_messages_stay_together() {
        let builder = ExchangeBuilder::new(Box::new(NeverContinue));
        let exchanges = builder.build(
            "c1",
            vec![
                msg("u1", AuthorRole::User, "a"),
                msg("u2", AuthorRole::User, "b"),
                msg("a1", AuthorRole::Assistant, "c"),
            ],
        );
        assert_eq!(ids(&exchanges), vec![vec!["u1", "u2", "a1"]]);
    }

    #[test]
    fn system_and_tool_messages_join_current_exchange() {
        let builder = ExchangeBuilder::new(Box::new(NeverContinue));
        let exchanges = builder.build(
            "c1",
            vec![
                msg("s", AuthorRole::System, "sys"),
                msg("u1", AuthorRole::User, "q"),
                msg("a1", AuthorRole::Assistant, "call"),
                msg("t1", AuthorRole::Tool, "result"),
                msg("a2", AuthorRole::Assistant, "answer"),
                msg("x", AuthorRole::Unknown("critic".into()), "hmm"),
                msg("u2", AuthorRole::User, "next"),
            ],
        );
        assert_eq!(
            ids(&exchanges),
            vec![vec!["s", "u1", "a1", "t1", "a2", "x"], vec!["u2"]]
        );
    }

    #[test]
    fn empty_input_has_no_exchanges() {
        let builder = ExchangeBuilder::new(Box::new(NeverContinue));
        assert!(builder.build("c1", Vec::new()).is_empty());
    }
}
