//! Long-term conversational memory.
//!
//! Best-effort collaborator: both `search` and `add` may fail, and every
//! call site tolerates failure without aborting the chat turn. The concrete
//! store is a per-user list of remembered snippets ranked by keyword
//! overlap; no embedding infrastructure is involved.

mod file_memory;

use thiserror::Error;

pub use file_memory::FileMemory;

use crate::llm::ChatMessage;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Remembered-snippet store.
pub trait Memory: Send + Sync {
    /// Snippets relevant to `query` for this user, most relevant first.
    fn search(&self, query: &str, user_id: &str) -> Result<Vec<String>>;

    /// Remember the messages of one completed chat turn.
    fn add(&self, turn: &[ChatMessage], user_id: &str, session_id: &str) -> Result<()>;
}
