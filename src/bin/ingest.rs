//! Corpus ingest binary: reads the places-with-reviews JSON export, chunks
//! and embeds every review, and fills the review index.
//!
//! Usage: `resenha-ingest <path/to/places_reviews.json> [--reset]`

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};

use resenha_backend::core::config::AppPaths;
use resenha_backend::core::logging;
use resenha_backend::embedding::HttpEmbedder;
use resenha_backend::index::{ReviewIndex, SqliteReviewIndex};
use resenha_backend::ingest::{self, IngestConfig};
use resenha_backend::tokenizer::{Tokenizer, TokenizerFamily};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(json_path) = args.iter().find(|arg| !arg.starts_with("--")) else {
        bail!("usage: resenha-ingest <path/to/places_reviews.json> [--reset]");
    };
    let json_path = PathBuf::from(json_path);
    let reset = args.iter().any(|arg| arg == "--reset");

    let index: Arc<dyn ReviewIndex> = Arc::new(
        SqliteReviewIndex::with_path(paths.index_db_path.clone())
            .await
            .context("Failed to open review index")?,
    );
    if reset {
        tracing::info!("Clearing existing review index");
        index.clear().await.context("Failed to clear review index")?;
    }

    let embedder = Arc::new(HttpEmbedder::from_env().context("Embedder configuration missing")?);

    // The corpus was chunked with a cl100k-class encoding; keep the same
    // family for size estimates regardless of the chat model.
    let tokenizer = Tokenizer::new(TokenizerFamily::Cl100kBase);

    let stats = ingest::run(
        embedder,
        index.clone(),
        &json_path,
        &IngestConfig::default(),
        &tokenizer,
    )
    .await
    .context("Ingest failed")?;

    let total = index.count().await.context("Failed to count chunks")?;
    tracing::info!(
        "Pipeline complete: {} places, {} reviews, {} chunks ({} documents in index)",
        stats.places,
        stats.reviews,
        stats.chunks,
        total
    );

    Ok(())
}
