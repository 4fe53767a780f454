use async_trait::async_trait;

use crate::core::errors::ApiError;

/// Role of a stored conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    Human,
    Ai,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::Human => "human",
            TurnRole::Ai => "ai",
        }
    }

    pub fn from_str(role: &str) -> Self {
        match role {
            "ai" => TurnRole::Ai,
            _ => TurnRole::Human,
        }
    }
}

/// One message of a session's append-only conversation log.
#[derive(Debug, Clone)]
pub struct StoredTurn {
    pub role: TurnRole,
    pub content: String,
    pub created_at: String,
}

impl StoredTurn {
    /// A turn synthesized by the pipeline (e.g. a history summary) rather
    /// than persisted by the store.
    pub fn synthesized(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Human,
            content: content.into(),
            created_at: String::new(),
        }
    }
}

/// Durable per-session ordered message log.
///
/// Turns are append-only: past turns are never mutated or deleted except by
/// the explicit `clear` operation. `load_all` returns insertion order.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn load_all(&self, session_id: &str) -> Result<Vec<StoredTurn>, ApiError>;

    async fn append(&self, session_id: &str, role: TurnRole, content: &str)
        -> Result<(), ApiError>;

    /// Remove every turn of the session. Clearing an already-empty session
    /// is not an error.
    async fn clear(&self, session_id: &str) -> Result<(), ApiError>;
}
