//! End-to-end assistant turns against mock collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use resenha_backend::assistant::{RagAssistant, RespondOptions};
use resenha_backend::core::config::RuntimeConfig;
use resenha_backend::core::errors::ApiError;
use resenha_backend::embedding::Embedder;
use resenha_backend::index::{
    Retriever, ReviewIndex, ReviewMetadata, SearchResults, StoredReview,
};
use resenha_backend::llm::{ChatMessage, LlmClient};
use resenha_backend::memory::{MemoryStore, StoredTurn, TurnRole};
use resenha_backend::prompt::PromptSpec;
use resenha_backend::translate::Translator;

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

struct MockIndex {
    results: SearchResults,
    last_k: AtomicUsize,
}

impl MockIndex {
    fn empty() -> Self {
        Self {
            results: SearchResults::default(),
            last_k: AtomicUsize::new(0),
        }
    }

    fn with_distances(distances: &[f32]) -> Self {
        let mut results = SearchResults::default();
        for (i, dist) in distances.iter().enumerate() {
            results.documents.push(format!("review text {}", i));
            results.distances.push(*dist);
            results.metadatas.push(ReviewMetadata {
                name: Some(format!("Place {}", i)),
                ..Default::default()
            });
        }
        Self {
            results,
            last_k: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReviewIndex for MockIndex {
    async fn query(&self, _embedding: &[f32], k: usize) -> Result<SearchResults, ApiError> {
        self.last_k.store(k, Ordering::SeqCst);
        Ok(self.results.clone())
    }

    async fn insert_batch(&self, _items: Vec<(StoredReview, Vec<f32>)>) -> Result<(), ApiError> {
        Ok(())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        Ok(self.results.documents.len())
    }

    async fn clear(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// LLM mock that answers by prompt kind and records every call.
struct MockLlm {
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    history_check_reply: String,
    main_reply: String,
}

impl MockLlm {
    fn new(main_reply: &str, history_check_reply: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            history_check_reply: history_check_reply.to_string(),
            main_reply: main_reply.to_string(),
        }
    }

    fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_matching(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|messages| {
                messages
                    .last()
                    .map(|m| m.content.contains(needle))
                    .unwrap_or(false)
            })
            .count()
    }

    /// The generation call is the one carrying the assembled prompt.
    fn main_call(&self) -> Vec<ChatMessage> {
        self.calls()
            .into_iter()
            .find(|messages| {
                messages
                    .last()
                    .map(|m| m.content.contains("User's question:"))
                    .unwrap_or(false)
            })
            .expect("no main generation call recorded")
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError> {
        self.calls.lock().unwrap().push(messages.clone());

        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if prompt.contains("Responda apenas com \"SIM\" ou \"NÃO\"") {
            return Ok(self.history_check_reply.clone());
        }
        if prompt.contains("Summarize the following chat history") {
            return Ok("o resumo da conversa".to_string());
        }
        if prompt.contains("Correct the Markdown formatting") {
            return Ok(format!("markdown_fixed({})", prompt_suffix(&prompt)));
        }
        Ok(self.main_reply.clone())
    }
}

fn prompt_suffix(prompt: &str) -> String {
    prompt
        .rsplit("readability:")
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

struct MockTranslator {
    detected: String,
}

#[async_trait]
impl Translator for MockTranslator {
    async fn detect_language(&self, _text: &str) -> String {
        self.detected.clone()
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, ApiError> {
        Ok(format!("translated[{}]({})", target_lang, text))
    }
}

#[derive(Default)]
struct InMemoryStore {
    turns: Mutex<HashMap<String, Vec<StoredTurn>>>,
}

impl InMemoryStore {
    fn with_turns(session_id: &str, contents: &[(&str, TurnRole)]) -> Self {
        let store = Self::default();
        {
            let mut turns = store.turns.lock().unwrap();
            let entry = turns.entry(session_id.to_string()).or_default();
            for (content, role) in contents {
                entry.push(StoredTurn {
                    role: *role,
                    content: content.to_string(),
                    created_at: String::new(),
                });
            }
        }
        store
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn load_all(&self, session_id: &str) -> Result<Vec<StoredTurn>, ApiError> {
        Ok(self
            .turns
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(
        &self,
        session_id: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<(), ApiError> {
        self.turns
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .push(StoredTurn {
                role,
                content: content.to_string(),
                created_at: String::new(),
            });
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), ApiError> {
        self.turns.lock().unwrap().remove(session_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn test_config(native_language: &str) -> RuntimeConfig {
    let yaml = format!(
        "\
llm: llama-3.3-70b-versatile
vectordb:
  threshold: 0.3
  n_results: 5
memory_strategies:
  trimming_window_size: 6
  summarization_max_tokens: 1000
reasoning_strategies:
  default: CoT
  CoT: Think step by step.
translation:
  native_language: \"{}\"
",
        native_language
    );
    serde_yaml::from_str(&yaml).unwrap()
}

fn test_prompt_spec() -> PromptSpec {
    let value: serde_yaml::Value = serde_yaml::from_str(
        "\
role: review analyst
style_or_tone:
  - objective
instruction: answer from the reviews
",
    )
    .unwrap();
    PromptSpec::from_value(&value).unwrap()
}

fn build_assistant(
    index: Arc<MockIndex>,
    llm: Arc<MockLlm>,
    memory: Arc<InMemoryStore>,
    detected_lang: &str,
    native_lang: &str,
) -> RagAssistant {
    let retriever = Retriever::new(Arc::new(MockEmbedder), index);
    RagAssistant::new(
        retriever,
        llm,
        memory,
        Arc::new(MockTranslator {
            detected: detected_lang.to_string(),
        }),
        test_prompt_spec(),
        test_config(native_lang),
    )
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_index_answers_with_empty_context() {
    let llm = Arc::new(MockLlm::new("Não encontrei resenhas.", "NÃO"));
    let assistant = build_assistant(
        Arc::new(MockIndex::empty()),
        llm.clone(),
        Arc::new(InMemoryStore::default()),
        "pt",
        "pt",
    );

    let answer = assistant
        .respond("default", "Is this shop good?", RespondOptions::default())
        .await
        .unwrap();

    assert_eq!(answer, "Não encontrei resenhas.");

    let main_call = llm.main_call();
    let prompt = &main_call.last().unwrap().content;
    assert!(prompt.contains("Context:\n"));
    assert!(prompt.contains("Pergunta:\nIs this shop good?"));
    assert!(!prompt.contains("Histórico:"));
}

#[tokio::test]
async fn history_block_contains_the_two_prior_turns() {
    let memory = Arc::new(InMemoryStore::with_turns(
        "default",
        &[
            ("Qual o melhor petshop do Centro?", TurnRole::Human),
            ("O Pet Place é o mais elogiado.", TurnRole::Ai),
        ],
    ));
    let llm = Arc::new(MockLlm::new("Fica na Rua das Flores.", "SIM"));
    let assistant = build_assistant(
        Arc::new(MockIndex::with_distances(&[0.1])),
        llm.clone(),
        memory,
        "pt",
        "pt",
    );

    let answer = assistant
        .respond("default", "E onde fica?", RespondOptions::default())
        .await
        .unwrap();

    assert_eq!(answer, "Fica na Rua das Flores.");

    let main_call = llm.main_call();
    let prompt = &main_call.last().unwrap().content;
    assert!(prompt.contains("Histórico:"));
    assert!(prompt.contains("Qual o melhor petshop do Centro?"));
    assert!(prompt.contains("O Pet Place é o mais elogiado."));
    assert!(prompt.contains("Nova pergunta:\nE onde fica?"));
}

#[tokio::test]
async fn foreign_language_answer_is_translated_then_markdown_fixed() {
    let llm = Arc::new(MockLlm::new("resposta em português", "NÃO"));
    let assistant = build_assistant(
        Arc::new(MockIndex::with_distances(&[0.1])),
        llm.clone(),
        Arc::new(InMemoryStore::default()),
        "en",
        "pt",
    );

    let answer = assistant
        .respond("default", "Is the grooming good?", RespondOptions::default())
        .await
        .unwrap();

    // translate first, then the markdown pass over the translated text
    assert_eq!(
        answer,
        "markdown_fixed(translated[en](resposta em português))"
    );
    assert_eq!(llm.calls_matching("Correct the Markdown formatting"), 1);
}

#[tokio::test]
async fn native_language_answer_is_returned_raw() {
    let llm = Arc::new(MockLlm::new("resposta em português", "NÃO"));
    let assistant = build_assistant(
        Arc::new(MockIndex::with_distances(&[0.1])),
        llm.clone(),
        Arc::new(InMemoryStore::default()),
        "pt",
        "pt",
    );

    let answer = assistant
        .respond("default", "O banho e tosa é bom?", RespondOptions::default())
        .await
        .unwrap();

    // No translation and, notably, no markdown repair on this branch.
    assert_eq!(answer, "resposta em português");
    assert_eq!(llm.calls_matching("Correct the Markdown formatting"), 0);
}

#[tokio::test]
async fn history_check_is_skipped_without_two_prior_turns() {
    let llm = Arc::new(MockLlm::new("resposta", "SIM"));
    let assistant = build_assistant(
        Arc::new(MockIndex::with_distances(&[0.1])),
        llm.clone(),
        Arc::new(InMemoryStore::with_turns(
            "default",
            &[("uma única mensagem", TurnRole::Human)],
        )),
        "pt",
        "pt",
    );

    assistant
        .respond("default", "E onde fica?", RespondOptions::default())
        .await
        .unwrap();

    // The classifier must not be consulted at all.
    assert_eq!(llm.calls_matching("Responda apenas com \"SIM\" ou \"NÃO\""), 0);

    let prompt = llm.main_call().last().unwrap().content.clone();
    assert!(!prompt.contains("Histórico:"));
}

#[tokio::test]
async fn over_budget_history_reaches_the_llm_as_one_summary_turn() {
    let long_question = "Uma pergunta bem longa sobre os serviços. ".repeat(60);
    let long_answer = "Uma resposta bem detalhada sobre os serviços. ".repeat(60);
    let memory = Arc::new(InMemoryStore::with_turns(
        "default",
        &[
            (long_question.as_str(), TurnRole::Human),
            (long_answer.as_str(), TurnRole::Ai),
        ],
    ));
    let llm = Arc::new(MockLlm::new("resposta", "NÃO"));
    let assistant = build_assistant(
        Arc::new(MockIndex::with_distances(&[0.1])),
        llm.clone(),
        memory,
        "pt",
        "pt",
    );

    assistant
        .respond("default", "Pode resumir?", RespondOptions::default())
        .await
        .unwrap();

    let main_call = llm.main_call();
    // Exactly one synthesized history turn plus the prompt itself.
    assert_eq!(main_call.len(), 2);
    assert!(main_call[0]
        .content
        .starts_with("Summary of previous conversation:"));
    assert!(main_call[0].content.contains("o resumo da conversa"));
}

#[tokio::test]
async fn caller_overrides_win_over_configured_defaults() {
    // Distance 0.45 is out under the configured 0.3 threshold but within the
    // caller's explicit 0.6.
    let index = Arc::new(MockIndex::with_distances(&[0.45]));
    let llm = Arc::new(MockLlm::new("resposta", "NÃO"));
    let assistant = build_assistant(
        index.clone(),
        llm.clone(),
        Arc::new(InMemoryStore::default()),
        "pt",
        "pt",
    );

    let opts = RespondOptions {
        n_results: Some(7),
        threshold: Some(0.6),
    };
    assistant.respond("default", "É bom?", opts).await.unwrap();

    assert_eq!(index.last_k.load(Ordering::SeqCst), 7);
    let prompt = llm.main_call().last().unwrap().content.clone();
    assert!(prompt.contains("review text 0"));

    // Same query with defaults: the hit is filtered out.
    let llm2 = Arc::new(MockLlm::new("resposta", "NÃO"));
    let assistant2 = build_assistant(
        Arc::new(MockIndex::with_distances(&[0.45])),
        llm2.clone(),
        Arc::new(InMemoryStore::default()),
        "pt",
        "pt",
    );
    assistant2
        .respond("default", "É bom?", RespondOptions::default())
        .await
        .unwrap();
    let prompt2 = llm2.main_call().last().unwrap().content.clone();
    assert!(!prompt2.contains("review text 0"));
}

#[tokio::test]
async fn generation_failure_propagates_to_the_caller() {
    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn chat(&self, _messages: Vec<ChatMessage>) -> Result<String, ApiError> {
            Err(ApiError::Internal("provider down".to_string()))
        }
    }

    let retriever = Retriever::new(Arc::new(MockEmbedder), Arc::new(MockIndex::empty()));
    let assistant = RagAssistant::new(
        retriever,
        Arc::new(FailingLlm),
        Arc::new(InMemoryStore::default()),
        Arc::new(MockTranslator {
            detected: "pt".to_string(),
        }),
        test_prompt_spec(),
        test_config("pt"),
    );

    let result = assistant
        .respond("default", "É bom?", RespondOptions::default())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn clearing_a_session_twice_is_idempotent() {
    let store = InMemoryStore::with_turns("s1", &[("olá", TurnRole::Human)]);

    store.clear("s1").await.unwrap();
    assert!(store.load_all("s1").await.unwrap().is_empty());

    store.clear("s1").await.unwrap();
    assert!(store.load_all("s1").await.unwrap().is_empty());
}
