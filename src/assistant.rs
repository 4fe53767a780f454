//! The RAG orchestrator: one request/response cycle per call.

use std::sync::Arc;

use crate::core::config::RuntimeConfig;
use crate::core::errors::ApiError;
use crate::index::Retriever;
use crate::llm::helpers::{fix_markdown_response, needs_history_context};
use crate::llm::{ChatMessage, LlmClient};
use crate::memory::window::{condense_if_over_budget, window_view};
use crate::memory::{MemoryStore, StoredTurn, TurnRole};
use crate::prompt::{build_prompt, PromptSpec};
use crate::tokenizer::Tokenizer;
use crate::translate::Translator;

/// Per-call overrides for the retrieval knobs. Explicit values win over the
/// configured defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct RespondOptions {
    pub n_results: Option<usize>,
    pub threshold: Option<f32>,
}

/// Retrieval-augmented assistant over the review corpus.
///
/// Every collaborator is injected at construction; the orchestrator never
/// reaches for ambient state. It reads conversation memory but does not
/// write it: persisting the new turns is the caller's job once `respond`
/// returns.
pub struct RagAssistant {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    memory: Arc<dyn MemoryStore>,
    translator: Arc<dyn Translator>,
    tokenizer: Tokenizer,
    prompt_spec: PromptSpec,
    config: RuntimeConfig,
}

impl RagAssistant {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmClient>,
        memory: Arc<dyn MemoryStore>,
        translator: Arc<dyn Translator>,
        prompt_spec: PromptSpec,
        config: RuntimeConfig,
    ) -> Self {
        let tokenizer = Tokenizer::for_model(&config.llm);
        tracing::info!("RagAssistant initialized with model '{}'", config.llm);

        Self {
            retriever,
            llm,
            memory,
            translator,
            tokenizer,
            prompt_spec,
            config,
        }
    }

    /// Generate an answer for `query` within the given session.
    ///
    /// The turn walks a fixed sequence: detect language, retrieve reviews,
    /// window (and maybe summarize) history, decide whether history is
    /// needed, assemble the prompt, generate, and post-process. Retrieval,
    /// the history check, and summarization each degrade on failure; only
    /// the main generation call and translation propagate errors.
    pub async fn respond(
        &self,
        session_id: &str,
        query: &str,
        opts: RespondOptions,
    ) -> Result<String, ApiError> {
        tracing::info!("Generating response for query: '{}'", query);

        let detected_lang = self.translator.detect_language(query).await;
        tracing::info!("Detected language: {}", detected_lang);

        let threshold = opts.threshold.unwrap_or(self.config.vectordb.threshold);
        let n_results = opts.n_results.unwrap_or(self.config.vectordb.n_results);

        let relevant_reviews = self.retriever.retrieve(query, n_results, threshold).await;

        let past_messages = self.memory.load_all(session_id).await?;
        let window_size = self.config.memory_strategies.trimming_window_size;
        let windowed = window_view(&past_messages, window_size).to_vec();
        tracing::debug!(
            "Loaded {} messages from memory (window size: {}).",
            windowed.len(),
            window_size
        );

        let max_tokens = self.config.memory_strategies.summarization_max_tokens;
        let chat_history =
            condense_if_over_budget(self.llm.as_ref(), &self.tokenizer, windowed, max_tokens)
                .await;

        // The dependency check looks at the two most recent raw messages,
        // before windowing or summarization.
        let last_turn = if past_messages.len() >= 2 {
            past_messages[past_messages.len() - 2..]
                .iter()
                .map(|turn| turn.content.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            String::new()
        };

        let use_history = if last_turn.is_empty() {
            false
        } else {
            needs_history_context(self.llm.as_ref(), query, &last_turn).await
        };

        let context_block = if use_history {
            format!(
                "{}\n\nHistórico:\n{}\n\nNova pergunta:\n{}",
                relevant_reviews.join("\n"),
                last_turn,
                query
            )
        } else {
            format!("{}\n\nPergunta:\n{}", relevant_reviews.join("\n"), query)
        };

        let reasoning_instruction = self.config.reasoning_strategies.default_instruction();
        let prompt = build_prompt(
            &self.prompt_spec,
            &[context_block],
            query,
            reasoning_instruction,
        );

        let mut messages: Vec<ChatMessage> =
            chat_history.iter().map(turn_to_chat_message).collect();
        messages.push(ChatMessage::user(prompt));

        tracing::info!("Sending context-enriched prompt to LLM");
        let response = self.llm.chat(messages).await?;

        if detected_lang != self.config.translation.native_language {
            let translated = self.translator.translate(&response, &detected_lang).await?;
            let formatted = fix_markdown_response(self.llm.as_ref(), &translated).await;
            tracing::info!("Translated response to: {}", detected_lang);
            return Ok(formatted);
        }

        // Native-language answers are returned as generated, without a
        // Markdown pass.
        Ok(response)
    }
}

fn turn_to_chat_message(turn: &StoredTurn) -> ChatMessage {
    match turn.role {
        TurnRole::Human => ChatMessage::user(turn.content.clone()),
        TurnRole::Ai => ChatMessage::assistant(turn.content.clone()),
    }
}
