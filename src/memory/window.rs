//! Read-time history windowing and token-budget summarization.
//!
//! Neither operation mutates the stored sequence: windowing is a view of the
//! tail, and summarization replaces the view with a single synthesized turn.

use crate::llm::helpers::summarize_history;
use crate::llm::LlmClient;
use crate::memory::store::StoredTurn;
use crate::tokenizer::Tokenizer;

/// Marker prefixed to synthesized history so downstream consumers can tell
/// a summary apart from literal turns.
pub const SUMMARY_PREFIX: &str = "Summary of previous conversation:";

/// The last `window_size` user/assistant pairs of the stored sequence.
pub fn window_view(turns: &[StoredTurn], window_size: usize) -> &[StoredTurn] {
    let keep = window_size.saturating_mul(2).min(turns.len());
    &turns[turns.len() - keep..]
}

/// Collapse the windowed turns into one summary turn when their token count
/// exceeds the budget. On summarization failure the windowed turns are kept
/// unchanged; history is never dropped to empty here.
pub async fn condense_if_over_budget(
    llm: &dyn LlmClient,
    tokenizer: &Tokenizer,
    windowed: Vec<StoredTurn>,
    max_tokens: usize,
) -> Vec<StoredTurn> {
    let chat_text = windowed
        .iter()
        .map(|turn| turn.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let total_tokens = tokenizer.count_tokens(&chat_text);
    if total_tokens <= max_tokens {
        return windowed;
    }

    tracing::info!(
        "Chat history exceeds {} tokens ({} tokens). Summarizing...",
        max_tokens,
        total_tokens
    );

    match summarize_history(llm, &chat_text).await {
        Ok(summary) => {
            tracing::info!("Chat history summarized successfully.");
            vec![StoredTurn::synthesized(format!(
                "{}\n{}",
                SUMMARY_PREFIX, summary
            ))]
        }
        Err(err) => {
            tracing::warn!("Failed to summarize chat history: {}", err);
            windowed
        }
    }
}
