//! Data models for quizzes.

use serde::{Deserialize, Serialize};

use crate::flashcards::Difficulty;

/// A single multiple-choice question. `correct_answer` must be one of
/// `options`; `QuizStorage` enforces this on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    /// Time limit in minutes.
    pub time: i32,
    pub questions: Vec<Question>,
    /// Number of times the quiz has been completed.
    #[serde(default)]
    pub completed_times: i32,
    /// Best score achieved, as a number of correct answers.
    #[serde(default)]
    pub best_score: i32,
}

/// Incoming quiz payload (`QUIZ_JSON` or manual create).
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuiz {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub time: i32,
    pub questions: Vec<Question>,
}
