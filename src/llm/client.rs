use async_trait::async_trait;

use super::types::ChatMessage;
use crate::core::errors::ApiError;

/// Chat completion client. One implementation per upstream provider; the
/// orchestrator only ever sees this trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the full ordered message sequence, return the completion text.
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ApiError>;
}
