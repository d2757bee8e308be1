use std::sync::Arc;

use anyhow::Context;

use chat_tagger::export::load_export;
use chat_tagger::{BatchTagger, ConversationTagger, TaggerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON results.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CHAT_TAGGER_INPUT").ok())
        .unwrap_or_else(|| {
            eprintln!("Usage: chat-tagger <conversations.json>");
            eprintln!("  or set CHAT_TAGGER_INPUT=<path>");
            std::process::exit(2);
        });

    let config = TaggerConfig::from_env();
    let tagger = ConversationTagger::from_config(&config).context("invalid tagger configuration")?;

    eprintln!("🏷️  Chat Tagger v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Input: {}", path);
    eprintln!(
        "   Policies: branch={} ({}), continuation={}",
        config.branch_policy, config.branch_tie_break, config.continuation_policy
    );
    eprintln!(
        "   Rules: {} exchange, {} conversation",
        tagger.exchange_tagger().rules().len(),
        tagger.conversation_rules().len()
    );

    let conversations = load_export(&path)
        .await
        .with_context(|| format!("failed to load export {}", path))?;

    let batch = BatchTagger::new(Arc::new(tagger), config.max_parallel);
    let results = batch.tag_all(conversations).await;

    let failures: usize = results.iter().map(|r| r.diagnostics.len()).sum();
    println!("{}", serde_json::to_string_pretty(&results)?);
    eprintln!(
        "   Tagged {} conversations ({} rule failures)",
        results.len(),
        failures
    );

    Ok(())
}
