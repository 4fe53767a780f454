use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::assistant::RespondOptions;
use crate::core::errors::ApiError;
use crate::memory::{MemoryStore, TurnRole};
use crate::state::AppState;

const DEFAULT_SESSION_ID: &str = "default";
const GENERIC_FAILURE_ANSWER: &str = "Sorry, an error occurred while processing your question.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub n_results: Option<usize>,
    pub threshold: Option<f32>,
}

/// One conversational turn: generate an answer, then persist both turns.
///
/// The assistant itself never writes memory; this handler appends the user
/// message and the final answer after generation. A generation failure is
/// answered with a fixed generic message so the session log stays
/// well-formed.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message cannot be empty".to_string()));
    }

    let session_id = payload
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    tracing::info!("User question: {}", message);

    let opts = RespondOptions {
        n_results: payload.n_results,
        threshold: payload.threshold,
    };

    let answer = match state.assistant.respond(&session_id, &message, opts).await {
        Ok(answer) => {
            tracing::info!("Response successfully generated.");
            answer
        }
        Err(err) => {
            tracing::error!("Error generating response: {}", err);
            GENERIC_FAILURE_ANSWER.to_string()
        }
    };

    state
        .memory
        .append(&session_id, TurnRole::Human, &message)
        .await?;
    state
        .memory
        .append(&session_id, TurnRole::Ai, &answer)
        .await?;

    Ok(Json(json!({
        "session_id": session_id,
        "answer": answer,
    })))
}
