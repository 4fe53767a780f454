use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::store::{MemoryStore, StoredTurn, TurnRole};
use crate::core::errors::ApiError;

const SCHEMA_VERSION: i64 = 1;
const DEFAULT_SESSION_TITLE: &str = "Default Session";
const MAX_HISTORY_LIMIT: i64 = 1000;
const MAX_TITLE_LEN: usize = 160;

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: i64,
    pub preview: String,
}

/// SQLite-backed conversation memory, WAL mode, pooled connections.
#[derive(Debug, Clone)]
pub struct SqliteMemoryStore {
    pool: SqlitePool,
}

impl SqliteMemoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<(), ApiError> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        if version != SCHEMA_VERSION {
            self.rebuild_schema().await?;
        }

        Ok(())
    }

    async fn rebuild_schema(&self) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DROP TABLE IF EXISTS messages")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        sqlx::query("DROP TABLE IF EXISTS sessions")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "\
            CREATE TABLE sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL CHECK(length(trim(title)) > 0),
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "\
            CREATE TABLE messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('human', 'ai')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )",
        )
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX idx_sessions_updated_at ON sessions(updated_at DESC)")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        sqlx::query("CREATE INDEX idx_messages_session_id_id ON messages(session_id, id)")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        let pragma = format!("PRAGMA user_version = {}", SCHEMA_VERSION);
        sqlx::query(&pragma)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, ApiError> {
        let rows = sqlx::query(
            "\
            SELECT s.id, s.title, s.created_at, s.updated_at,
                   (SELECT COUNT(*) FROM messages WHERE session_id = s.id) as message_count,
                   (SELECT content FROM messages WHERE session_id = s.id ORDER BY id DESC LIMIT 1) as last_message
            FROM sessions s
            ORDER BY s.updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.into_iter()
            .map(session_info_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::internal)
    }

    pub async fn create_session(&self, title: Option<String>) -> Result<String, ApiError> {
        let session_id = Uuid::new_v4().to_string();
        let title = normalize_title(title);

        sqlx::query("INSERT INTO sessions (id, title) VALUES (?1, ?2)")
            .bind(&session_id)
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(session_id)
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn load_all(&self, session_id: &str) -> Result<Vec<StoredTurn>, ApiError> {
        let rows = sqlx::query(
            "\
            SELECT role, content, created_at
            FROM (
                SELECT id, role, content, created_at
                FROM messages
                WHERE session_id = ?1
                ORDER BY id DESC
                LIMIT ?2
            )
            ORDER BY id ASC",
        )
        .bind(session_id)
        .bind(MAX_HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.into_iter()
            .map(turn_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::internal)
    }

    async fn append(
        &self,
        session_id: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        ensure_session(&mut tx, session_id).await?;

        sqlx::query("INSERT INTO messages (session_id, role, content) VALUES (?1, ?2, ?3)")
            .bind(session_id)
            .bind(role.as_str())
            .bind(content)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        touch_session_tx(&mut tx, session_id).await?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM messages WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }
}

fn session_info_from_row(row: sqlx::sqlite::SqliteRow) -> Result<SessionInfo, sqlx::Error> {
    let last_message: Option<String> = row.try_get("last_message")?;
    let preview = last_message.unwrap_or_default().chars().take(100).collect();

    Ok(SessionInfo {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        message_count: row.try_get("message_count")?,
        preview,
    })
}

fn turn_from_row(row: sqlx::sqlite::SqliteRow) -> Result<StoredTurn, sqlx::Error> {
    let role: String = row.try_get("role")?;

    Ok(StoredTurn {
        role: TurnRole::from_str(&role),
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn ensure_session(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
) -> Result<(), ApiError> {
    sqlx::query("INSERT OR IGNORE INTO sessions (id, title) VALUES (?1, ?2)")
        .bind(session_id)
        .bind(DEFAULT_SESSION_TITLE)
        .execute(&mut **tx)
        .await
        .map_err(ApiError::internal)?;
    Ok(())
}

async fn touch_session_tx(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
) -> Result<(), ApiError> {
    sqlx::query(
        "UPDATE sessions SET updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
    )
    .bind(session_id)
    .execute(&mut **tx)
    .await
    .map_err(ApiError::internal)?;
    Ok(())
}

fn normalize_title(title: Option<String>) -> String {
    let fallback = || format!("Session {}", Utc::now().format("%Y-%m-%d %H:%M"));

    let Some(raw) = title else {
        return fallback();
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback();
    }

    trimmed.chars().take(MAX_TITLE_LEN).collect()
}
