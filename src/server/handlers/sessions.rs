use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::memory::{MemoryStore, TurnRole};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.memory.list_sessions().await?;
    let result: Vec<Value> = sessions
        .into_iter()
        .map(|session| {
            json!({
                "id": session.id,
                "title": session.title,
                "created_at": session.created_at,
                "updated_at": session.updated_at,
                "message_count": session.message_count,
                "preview": session.preview
            })
        })
        .collect();
    Ok(Json(json!({"sessions": result})))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = state.memory.create_session(payload.title).await?;
    Ok(Json(json!({"session_id": session_id})))
}

pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let turns = state.memory.load_all(&session_id).await?;

    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(100);

    let start = turns.len().saturating_sub(limit);
    let formatted: Vec<Value> = turns[start..]
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::Ai => "assistant",
                TurnRole::Human => "user",
            };

            json!({
                "role": role,
                "content": turn.content,
                "created_at": turn.created_at,
            })
        })
        .collect();

    Ok(Json(json!({"messages": formatted})))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.memory.delete_session(&session_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    Ok(Json(json!({"success": true})))
}

/// Clear a session's conversation log. Idempotent: clearing an empty or
/// unknown session succeeds.
pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.memory.clear(&session_id).await?;
    Ok(Json(json!({"success": true})))
}
