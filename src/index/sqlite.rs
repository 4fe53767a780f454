//! SQLite-backed review index.
//!
//! In-process vector index using SQLite for chunk storage and brute-force
//! cosine distance for search. Embeddings are stored as little-endian f32
//! BLOBs.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ReviewIndex, ReviewMetadata, SearchResults, StoredReview};
use crate::core::errors::ApiError;

pub struct SqliteReviewIndex {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteReviewIndex {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self { pool, db_path };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS review_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }
}

#[async_trait]
impl ReviewIndex for SqliteReviewIndex {
    async fn query(&self, embedding: &[f32], k: usize) -> Result<SearchResults, ApiError> {
        if k == 0 {
            return Ok(SearchResults::default());
        }

        let rows = sqlx::query("SELECT content, metadata, embedding FROM review_chunks")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let mut scored: Vec<(String, f32, ReviewMetadata)> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                // Cosine distance, same convention as the embedding index the
                // corpus was built with: 0 = identical, higher = farther.
                let distance = 1.0 - Self::cosine_similarity(embedding, &stored_emb);

                let metadata_str: String = row.get("metadata");
                let metadata = serde_json::from_str(&metadata_str).unwrap_or_default();

                Some((row.get("content"), distance, metadata))
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let mut results = SearchResults::default();
        for (document, distance, metadata) in scored {
            results.documents.push(document);
            results.distances.push(distance);
            results.metadatas.push(metadata);
        }

        Ok(results)
    }

    async fn insert_batch(&self, items: Vec<(StoredReview, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (review, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str =
                serde_json::to_string(&review.metadata).map_err(ApiError::internal)?;

            sqlx::query(
                "INSERT OR REPLACE INTO review_chunks (chunk_id, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&review.chunk_id)
            .bind(&review.text)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn clear(&self) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM review_chunks")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> SqliteReviewIndex {
        let tmp = std::env::temp_dir().join(format!("resenha-index-test-{}.db", uuid::Uuid::new_v4()));
        SqliteReviewIndex::with_path(tmp).await.unwrap()
    }

    fn make_review(id: &str, text: &str, name: &str) -> StoredReview {
        StoredReview {
            chunk_id: id.to_string(),
            text: text.to_string(),
            metadata: ReviewMetadata {
                name: Some(name.to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn query_orders_by_ascending_distance() {
        let index = test_index().await;

        index
            .insert_batch(vec![
                (make_review("c1", "great service", "Pet Place"), vec![1.0, 0.0]),
                (make_review("c2", "awful queue", "Dog World"), vec![0.0, 1.0]),
                (make_review("c3", "decent prices", "Cat Corner"), vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.0], 3).await.unwrap();

        assert_eq!(results.documents.len(), 3);
        assert_eq!(results.documents[0], "great service");
        assert!(results.distances[0] <= results.distances[1]);
        assert!(results.distances[1] <= results.distances[2]);
        assert_eq!(results.metadatas[0].name.as_deref(), Some("Pet Place"));
    }

    #[tokio::test]
    async fn query_returns_at_most_k() {
        let index = test_index().await;

        index
            .insert_batch(vec![
                (make_review("c1", "a", "A"), vec![1.0, 0.0]),
                (make_review("c2", "b", "B"), vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(results.documents.len(), 1);

        let empty = index.query(&[1.0, 0.0], 0).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn empty_index_returns_no_results() {
        let index = test_index().await;
        let results = index.query(&[1.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn clear_and_count() {
        let index = test_index().await;

        index
            .insert_batch(vec![(make_review("c1", "a", "A"), vec![1.0])])
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
