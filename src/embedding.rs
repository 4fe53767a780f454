//! Query/document embedding behind a narrow trait.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::ApiError;

/// Embedding function: same number of vectors out as texts in, fixed
/// dimensionality per model version.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}

/// Embedder speaking the OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var("EMBEDDING_BASE_URL")
            .map_err(|_| ApiError::BadRequest("EMBEDDING_BASE_URL is not set".to_string()))?;
        let model = std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| {
            "sentence-transformers/distiluse-base-multilingual-cased-v2".to_string()
        });
        let api_key = std::env::var("EMBEDDING_API_KEY").ok();

        Ok(Self::new(base_url, model, api_key))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Embedding error: {}", text)));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(ApiError::Internal(format!(
                "Embedding count mismatch: {} inputs, {} vectors",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}
