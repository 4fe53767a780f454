use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::client::LlmClient;
use super::types::ChatMessage;
use crate::core::errors::ApiError;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";

/// Groq chat client speaking the OpenAI-compatible completions API.
#[derive(Clone)]
pub struct GroqClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl GroqClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            client: Client::new(),
        }
    }

    /// Build a client from the environment; the API key is never read from
    /// config files.
    pub fn from_env(model: &str) -> Result<Self, ApiError> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| ApiError::BadRequest("GROQ_API_KEY is not set".to_string()))?;
        let base_url =
            std::env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(base_url, api_key, model.to_string()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Groq chat error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }
}
