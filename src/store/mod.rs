//! JSON table storage.
//!
//! Every domain record lives in a named table. A table is an ordered list of
//! opaque JSON records; schema validation happens in the typed storages
//! layered on top (`flashcards::storage`, `quizzes::storage`), not here.

mod file_store;
mod memory_store;

use serde_json::Value;
use thiserror::Error;

pub use file_store::JsonFileStore;
pub use memory_store::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage interface for named tables of JSON records.
///
/// Implementations must make `load` after `append`/`overwrite` observe the
/// written records in order. There is no partial-failure contract for
/// `append_many`: either all records are appended or none are.
pub trait TableStore: Send + Sync {
    /// Load all records of a table, oldest first. A table that was never
    /// written loads as empty.
    fn load(&self, table: &str) -> Result<Vec<Value>>;

    /// Append a single record to a table.
    fn append(&self, table: &str, record: Value) -> Result<()>;

    /// Append a batch of records to a table in order.
    fn append_many(&self, table: &str, records: Vec<Value>) -> Result<()>;

    /// Replace the full contents of a table.
    fn overwrite(&self, table: &str, records: Vec<Value>) -> Result<()>;
}

/// Next sequential id for a table of records carrying a numeric `id` field:
/// `max(existing ids) + 1`, or 1 for an empty table.
pub fn next_id(records: &[Value]) -> i64 {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .max()
        .unwrap_or(0)
        + 1
}

/// Table names used by the backend.
pub mod tables {
    pub const DECKS: &str = "decks";
    pub const FLASHCARDS: &str = "flashcards";
    pub const QUIZZES: &str = "quizzes";
}
