//! Language detection and translation behind a narrow trait.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::errors::ApiError;

const TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Detection is best-effort and never fails the turn; translation failures
/// propagate to the caller.
#[async_trait]
pub trait Translator: Send + Sync {
    /// ISO 639-1 code of the text's language, or "unknown" on failure.
    async fn detect_language(&self, text: &str) -> String;

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, ApiError>;
}

/// Google Translate client using the unofficial single-call endpoint with
/// automatic source-language detection.
#[derive(Clone)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: TRANSLATE_ENDPOINT.to_string(),
        }
    }

    async fn request(&self, text: &str, target_lang: &str) -> Result<Value, ApiError> {
        let res = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Translation request failed: {}",
                res.status()
            )));
        }

        res.json().await.map_err(ApiError::internal)
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn detect_language(&self, text: &str) -> String {
        match self.request(text, "en").await {
            Ok(payload) => payload
                .get(2)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            Err(err) => {
                tracing::warn!("Language detection failed: {}", err);
                "unknown".to_string()
            }
        }
    }

    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, ApiError> {
        let payload = self.request(text, target_lang).await?;

        // Segment array: [[["translated", "original", ...], ...], null, "sl", ...]
        let segments = payload
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| ApiError::Internal("Malformed translation response".to_string()))?;

        let translated: String = segments
            .iter()
            .filter_map(|segment| segment.get(0).and_then(|v| v.as_str()))
            .collect();

        Ok(translated)
    }
}
