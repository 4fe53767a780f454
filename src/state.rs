use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::assistant::RagAssistant;
use crate::core::config::{AppPaths, ConfigService};
use crate::embedding::HttpEmbedder;
use crate::index::{Retriever, SqliteReviewIndex};
use crate::llm::GroqClient;
use crate::memory::SqliteMemoryStore;
use crate::translate::GoogleTranslator;

#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub memory: Arc<SqliteMemoryStore>,
    pub assistant: Arc<RagAssistant>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire every collaborator once at startup. Any failure here aborts
    /// initialization: the assistant cannot run without its configuration,
    /// stores, or clients.
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let config_service = ConfigService::new(paths.clone());

        let config = config_service.load_runtime_config()?;
        let prompt_spec = config_service.load_prompt_spec()?;

        let memory = Arc::new(SqliteMemoryStore::new(paths.chat_db_path.clone()).await?);
        let index = Arc::new(SqliteReviewIndex::with_path(paths.index_db_path.clone()).await?);
        let embedder = Arc::new(HttpEmbedder::from_env()?);
        let llm = Arc::new(GroqClient::from_env(&config.llm)?);
        let translator = Arc::new(GoogleTranslator::new());

        let retriever = Retriever::new(embedder, index);
        let assistant = Arc::new(RagAssistant::new(
            retriever,
            llm,
            memory.clone(),
            translator,
            prompt_spec,
            config,
        ));

        Ok(Arc::new(AppState {
            paths,
            memory,
            assistant,
            started_at: Utc::now(),
        }))
    }
}
