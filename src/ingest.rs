//! Corpus ingest: places-with-reviews JSON → token-bounded chunks →
//! embeddings → review index.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::embedding::Embedder;
use crate::index::{ReviewIndex, ReviewMetadata, StoredReview};
use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Overlapping tokens between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunks embedded and inserted per batch.
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            chunk_overlap: 32,
            batch_size: 64,
        }
    }
}

/// One place with its nested reviews, as produced by the corpus export.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    pub name: Option<String>,
    pub street: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub author: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub date: Option<String>,
    pub response: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestStats {
    pub places: usize,
    pub reviews: usize,
    pub chunks: usize,
}

pub fn load_places(json_path: &Path) -> Result<Vec<Place>, ApiError> {
    let contents = std::fs::read_to_string(json_path).map_err(|err| {
        ApiError::BadRequest(format!("Cannot read {}: {}", json_path.display(), err))
    })?;

    serde_json::from_str(&contents).map_err(|err| {
        ApiError::BadRequest(format!("Invalid corpus JSON {}: {}", json_path.display(), err))
    })
}

/// Split every review into overlapping token-bounded chunks, each carrying a
/// copy of its parent place/review metadata. Empty review texts are skipped.
pub fn chunk_reviews(
    places: &[Place],
    config: &IngestConfig,
    tokenizer: &Tokenizer,
) -> Vec<StoredReview> {
    let mut chunks = Vec::new();

    for place in places {
        for review in &place.reviews {
            let Some(text) = review.text.as_deref() else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            for (chunk_index, chunk_text) in
                split_by_tokens(text, config, tokenizer).into_iter().enumerate()
            {
                let chunk_id = format!("chunk_{}", chunks.len());
                chunks.push(StoredReview {
                    chunk_id,
                    text: chunk_text,
                    metadata: ReviewMetadata {
                        name: place.name.clone(),
                        street: place.street.clone(),
                        neighborhood: place.neighborhood.clone(),
                        city: place.city.clone(),
                        place_type: place.place_type.clone(),
                        place_rating: place.rating,
                        review_rating: review.rating,
                        author: review.author.clone(),
                        date: review.date.clone(),
                        response: review.response.clone(),
                        chunk_index,
                    },
                });
            }
        }
    }

    chunks
}

/// Embed and insert chunks in batches.
pub async fn run(
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn ReviewIndex>,
    json_path: &Path,
    config: &IngestConfig,
    tokenizer: &Tokenizer,
) -> Result<IngestStats, ApiError> {
    tracing::info!("Loading corpus JSON from {}", json_path.display());
    let places = load_places(json_path)?;
    let review_count: usize = places.iter().map(|p| p.reviews.len()).sum();

    let chunks = chunk_reviews(&places, config, tokenizer);
    tracing::info!(
        "Generated {} chunks from {} reviews across {} places",
        chunks.len(),
        review_count,
        places.len()
    );

    let stats = IngestStats {
        places: places.len(),
        reviews: review_count,
        chunks: chunks.len(),
    };

    for batch in chunks.chunks(config.batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed(&texts).await?;

        let items: Vec<(StoredReview, Vec<f32>)> =
            batch.iter().cloned().zip(embeddings).collect();
        index.insert_batch(items).await?;
    }

    tracing::info!("Ingest complete: {} chunks indexed", stats.chunks);
    Ok(stats)
}

/// Split text into overlapping chunks sized by estimated token count,
/// preferring sentence boundaries near the end of each chunk.
fn split_by_tokens(text: &str, config: &IngestConfig, tokenizer: &Tokenizer) -> Vec<String> {
    let chunk_chars = tokenizer.chars_for_tokens(config.chunk_size).max(1);
    let overlap_chars = tokenizer.chars_for_tokens(config.chunk_overlap);
    let step = chunk_chars.saturating_sub(overlap_chars).max(1);

    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();
    let mut chunks = Vec::new();

    if total_chars == 0 {
        return chunks;
    }

    let mut start = 0;
    while start < total_chars {
        let end = (start + chunk_chars).min(total_chars);
        let chunk_text: String = chars[start..end].iter().collect();

        let final_text = if end < total_chars {
            cut_at_sentence_boundary(&chunk_text)
        } else {
            chunk_text
        };

        let trimmed = final_text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        start += step;
    }

    chunks
}

/// Cut at a sentence ending in the last fifth of the chunk, when one exists.
fn cut_at_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let mut search_start = (text.len() * 80) / 100;
    while search_start > 0 && !text.is_char_boundary(search_start) {
        search_start -= 1;
    }
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut_pos = search_start + pos + ending.len();
            return text[..cut_pos].to_string();
        }
    }

    text.to_string()
}
