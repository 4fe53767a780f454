use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::config::paths::AppPaths;
use crate::core::config::validation::validate_runtime_config;
use crate::core::errors::ApiError;
use crate::prompt::PromptSpec;

/// Typed runtime configuration, loaded once at startup and read-only after.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// LLM model identifier (e.g. "llama-3.3-70b-versatile").
    pub llm: String,
    #[serde(default)]
    pub vectordb: VectorDbConfig,
    #[serde(default)]
    pub memory_strategies: MemoryStrategies,
    #[serde(default)]
    pub reasoning_strategies: ReasoningStrategies,
    #[serde(default)]
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorDbConfig {
    /// Maximum cosine distance for a retrieved chunk to count as relevant.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryStrategies {
    /// Number of user/assistant pairs kept verbatim per turn.
    #[serde(default = "default_window_size")]
    pub trimming_window_size: usize,
    /// Token budget for windowed history before summarization kicks in.
    #[serde(default = "default_summarization_max_tokens")]
    pub summarization_max_tokens: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningStrategies {
    #[serde(default = "default_strategy_name")]
    pub default: String,
    #[serde(flatten)]
    pub strategies: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    /// ISO 639-1 code of the corpus language; answers in other languages
    /// are translated back to the user's language.
    #[serde(default = "default_native_language")]
    pub native_language: String,
}

impl ReasoningStrategies {
    /// Instruction text for a named strategy, if configured and non-empty.
    pub fn instruction_for(&self, name: &str) -> Option<&str> {
        self.strategies
            .get(name)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    /// Instruction text for the configured default strategy.
    pub fn default_instruction(&self) -> Option<&str> {
        self.instruction_for(&self.default)
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            n_results: default_n_results(),
        }
    }
}

impl Default for MemoryStrategies {
    fn default() -> Self {
        Self {
            trimming_window_size: default_window_size(),
            summarization_max_tokens: default_summarization_max_tokens(),
        }
    }
}

impl Default for ReasoningStrategies {
    fn default() -> Self {
        Self {
            default: default_strategy_name(),
            strategies: HashMap::new(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            native_language: default_native_language(),
        }
    }
}

fn default_threshold() -> f32 {
    0.3
}

fn default_n_results() -> usize {
    5
}

fn default_window_size() -> usize {
    6
}

fn default_summarization_max_tokens() -> usize {
    1000
}

fn default_strategy_name() -> String {
    "CoT".to_string()
}

fn default_native_language() -> String {
    "pt".to_string()
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RESENHA_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn prompts_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RESENHA_PROMPTS_PATH") {
            return PathBuf::from(path);
        }

        self.paths.project_root.join("prompts.yml")
    }

    /// Load and validate the runtime configuration. Any failure here is
    /// fatal at startup: the pipeline cannot run without its thresholds.
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig, ApiError> {
        let path = self.config_path();
        let contents = fs::read_to_string(&path).map_err(|err| {
            ApiError::BadRequest(format!("Cannot read config at {}: {}", path.display(), err))
        })?;

        let config: RuntimeConfig = serde_yaml::from_str(&contents).map_err(|err| {
            ApiError::BadRequest(format!("Invalid config at {}: {}", path.display(), err))
        })?;

        validate_runtime_config(&config)?;
        Ok(config)
    }

    /// Load the prompt template and resolve the shape of every section once,
    /// so the renderer never re-inspects configuration values.
    pub fn load_prompt_spec(&self) -> Result<PromptSpec, ApiError> {
        let path = self.prompts_path();
        let contents = fs::read_to_string(&path).map_err(|err| {
            ApiError::BadRequest(format!(
                "Cannot read prompts at {}: {}",
                path.display(),
                err
            ))
        })?;

        let root: serde_yaml::Value = serde_yaml::from_str(&contents).map_err(|err| {
            ApiError::BadRequest(format!("Invalid prompts at {}: {}", path.display(), err))
        })?;

        let section = root.get("rag_assistant_prompt").ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Missing 'rag_assistant_prompt' section in {}",
                path.display()
            ))
        })?;

        PromptSpec::from_value(section)
    }
}
