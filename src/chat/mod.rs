//! Tutor chat: streaming pipeline, action handling, and transcripts.

pub mod coordinator;
pub mod dispatcher;
pub mod prompt;
pub mod scanner;
pub mod sessions;

pub use coordinator::{ResponseProcessor, StreamCoordinator};
pub use dispatcher::ActionDispatcher;
pub use scanner::{ActionKind, ExtractedAction, ScanOutcome, ScanState, TagScanner};
pub use sessions::{
    ChatSession, ChatSessionStorage, ChatSessionSummary, SessionMessage, SessionStorageError,
};
