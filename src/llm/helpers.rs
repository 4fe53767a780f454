//! LLM-mediated helper judgments used around the main generation call.

use super::client::LlmClient;
use super::types::ChatMessage;
use crate::core::errors::ApiError;

/// Ask the LLM whether the current query depends on the previous turn.
///
/// The classifier speaks the corpus language and expects "SIM" or "NÃO";
/// any affirmative answer containing "sim" counts as a yes. Errors are
/// treated as "no history needed" so a flaky judgment never fails the turn.
pub async fn needs_history_context(llm: &dyn LlmClient, query: &str, last_turn: &str) -> bool {
    let check_prompt = format!(
        "O usuário fez a pergunta: \"{query}\"\n\n\
         Ela depende do seguinte histórico para ser compreendida?\n\
         Histórico:\n\
         \"{last_turn}\"\n\n\
         Responda apenas com \"SIM\" ou \"NÃO\"."
    );

    match llm.chat(vec![ChatMessage::user(check_prompt)]).await {
        Ok(response) => response.trim().to_lowercase().contains("sim"),
        Err(err) => {
            tracing::warn!("Error checking history dependency: {}", err);
            false
        }
    }
}

/// Condense windowed chat history into a short summary.
///
/// The caller decides what to do on failure; this helper only shapes the
/// request and trims the result.
pub async fn summarize_history(llm: &dyn LlmClient, chat_text: &str) -> Result<String, ApiError> {
    let summarization_prompt = format!(
        "Summarize the following chat history to preserve useful context for the next user query.\n\
         Be concise, accurate, and preserve the intent of both questions and answers.\n\n\
         Chat history:\n\
         {chat_text}"
    );

    let response = llm
        .chat(vec![ChatMessage::user(summarization_prompt)])
        .await?;
    Ok(response.trim().to_string())
}

/// Repair Markdown formatting without changing wording. Returns the input
/// unchanged when the repair call fails.
pub async fn fix_markdown_response(llm: &dyn LlmClient, raw_response: &str) -> String {
    let prompt = format!(
        "Correct the Markdown formatting of the following text. \
         Do not change the wording, structure, or meaning. \
         If you detect multiple items listed in the text, convert them into bullet points with '-' markers. \
         Only fix Markdown syntax issues and improve readability:\n\n{raw_response}"
    );

    match llm.chat(vec![ChatMessage::user(prompt)]).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!("Error formatting Markdown with LLM: {}", err);
            raw_response.to_string()
        }
    }
}
