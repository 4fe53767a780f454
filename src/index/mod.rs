pub mod retriever;
pub mod sqlite;
pub mod store;

pub use retriever::Retriever;
pub use sqlite::SqliteReviewIndex;
pub use store::{ReviewIndex, ReviewMetadata, SearchResults, StoredReview};
