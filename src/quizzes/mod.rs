//! Quiz storage and validation.

pub mod models;
pub mod storage;

pub use models::{NewQuiz, Question, Quiz};
pub use storage::{QuizStorage, QuizStorageError};
