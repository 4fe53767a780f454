//! Review retrieval: embed the query, ask the index, filter, format.

use std::sync::Arc;

use super::store::{ReviewIndex, ReviewMetadata};
use crate::embedding::Embedder;

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn ReviewIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn ReviewIndex>) -> Self {
        Self { embedder, index }
    }

    /// Retrieve the reviews most similar to `query`, formatted for prompt
    /// context.
    ///
    /// Retrieval is best-effort: an embedding or index failure degrades to an
    /// empty result and is never fatal to the turn. Only hits strictly under
    /// the distance threshold survive; index ranking order is preserved.
    pub async fn retrieve(&self, query: &str, n_results: usize, threshold: f32) -> Vec<String> {
        tracing::info!("Retrieving top {} similar documents for query: '{}'", n_results, query);

        let query_embedding = match self.embedder.embed(&[query.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                tracing::error!("Embedder returned no vector for query");
                return Vec::new();
            }
            Err(err) => {
                tracing::error!("Error embedding query: {}", err);
                return Vec::new();
            }
        };

        let results = match self.index.query(&query_embedding, n_results).await {
            Ok(results) => results,
            Err(err) => {
                tracing::error!("Error querying vector index: {}", err);
                return Vec::new();
            }
        };

        if results.is_empty() {
            tracing::warn!("No documents returned from vector search.");
            return Vec::new();
        }

        let relevant: Vec<String> = results
            .documents
            .iter()
            .zip(results.distances.iter())
            .zip(results.metadatas.iter())
            .filter(|((_, dist), _)| **dist < threshold)
            .map(|((doc, _), meta)| format_review(doc, meta))
            .collect();

        tracing::debug!(
            "Found {} relevant documents under threshold {}.",
            relevant.len(),
            threshold
        );
        relevant
    }
}

/// Format one review with light place metadata for prompt context. Missing
/// fields render as named placeholders instead of failing.
pub fn format_review(doc: &str, meta: &ReviewMetadata) -> String {
    let name = meta.name.as_deref().unwrap_or("Unknown name");
    let rating = meta
        .place_rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let street = meta.street.as_deref().unwrap_or("No street provided");
    let neighborhood = meta
        .neighborhood
        .as_deref()
        .unwrap_or("No neighborhood provided");
    let city = meta.city.as_deref().unwrap_or("No city provided");

    format!(
        "{} (Rating: {}) — {}, {}, {}\nReview: {}",
        name,
        rating,
        street,
        neighborhood,
        city,
        doc.trim()
    )
}
