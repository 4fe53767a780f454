//! ReviewIndex trait — abstract interface for the review vector index.
//!
//! The primary implementation is `SqliteReviewIndex` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// Place and review metadata carried alongside every indexed chunk.
///
/// Every field is optional: the corpus is scraped data and any of these can
/// be missing. Rendering decides the placeholders, not the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub name: Option<String>,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub place_rating: Option<f64>,
    pub review_rating: Option<f64>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub response: Option<String>,
    #[serde(default)]
    pub chunk_index: usize,
}

/// A token-bounded slice of one review, plus its parent metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReview {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ReviewMetadata,
}

/// Nearest-neighbor query result: parallel arrays in ascending-distance
/// order, unfiltered. The same position indexes the same hit across all
/// three. Filtering by threshold is the retriever's job.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub distances: Vec<f32>,
    pub metadatas: Vec<ReviewMetadata>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Abstract vector index over review chunks.
#[async_trait]
pub trait ReviewIndex: Send + Sync {
    /// Return up to `k` nearest neighbors of `embedding`, ascending distance.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<SearchResults, ApiError>;

    /// Insert chunks with their embedding vectors.
    async fn insert_batch(&self, items: Vec<(StoredReview, Vec<f32>)>) -> Result<(), ApiError>;

    /// Total indexed chunk count.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Drop all indexed chunks.
    async fn clear(&self) -> Result<(), ApiError>;
}
