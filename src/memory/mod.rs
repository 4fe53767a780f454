pub mod sqlite;
pub mod store;
pub mod window;

pub use sqlite::{SessionInfo, SqliteMemoryStore};
pub use store::{MemoryStore, StoredTurn, TurnRole};
