//! Typed quiz storage over the table store.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::store::{self, tables, StoreError, TableStore};

use super::models::{NewQuiz, Quiz};

#[derive(Error, Debug)]
pub enum QuizStorageError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Quiz not found: {0}")]
    QuizNotFound(i64),

    #[error("Invalid quiz: {0}")]
    InvalidQuiz(String),
}

pub type Result<T> = std::result::Result<T, QuizStorageError>;

pub struct QuizStorage {
    store: Arc<dyn TableStore>,
}

impl QuizStorage {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        self.store
            .load(tables::QUIZZES)?
            .into_iter()
            .map(|r| serde_json::from_value(r).map_err(QuizStorageError::from))
            .collect()
    }

    pub fn get_quiz(&self, quiz_id: i64) -> Result<Quiz> {
        self.list_quizzes()?
            .into_iter()
            .find(|q| q.id == quiz_id)
            .ok_or(QuizStorageError::QuizNotFound(quiz_id))
    }

    /// Validate a quiz payload and append it with the next sequential id.
    ///
    /// Every question's `correct_answer` must be one of its `options`.
    pub fn create_quiz(&self, new: NewQuiz) -> Result<Quiz> {
        if new.title.trim().is_empty() {
            return Err(QuizStorageError::InvalidQuiz(
                "quiz title must not be empty".to_string(),
            ));
        }
        if new.time < 0 {
            return Err(QuizStorageError::InvalidQuiz(
                "time limit must not be negative".to_string(),
            ));
        }
        for question in &new.questions {
            if !question.options.contains(&question.correct_answer) {
                return Err(QuizStorageError::InvalidQuiz(format!(
                    "correct answer {:?} is not among the options of {:?}",
                    question.correct_answer, question.question_text
                )));
            }
        }

        let records = self.store.load(tables::QUIZZES)?;
        let quiz = Quiz {
            id: store::next_id(&records),
            title: new.title,
            description: new.description,
            difficulty: new.difficulty,
            time: new.time,
            questions: new.questions,
            completed_times: 0,
            best_score: 0,
        };
        self.store
            .append(tables::QUIZZES, serde_json::to_value(&quiz)?)?;
        Ok(quiz)
    }

    pub fn delete_quiz(&self, quiz_id: i64) -> Result<()> {
        let mut quizzes = self.list_quizzes()?;
        let before = quizzes.len();
        quizzes.retain(|q| q.id != quiz_id);
        if quizzes.len() == before {
            return Err(QuizStorageError::QuizNotFound(quiz_id));
        }
        self.overwrite(&quizzes)
    }

    /// Record a completed attempt, bumping the completion counter and the
    /// best score when beaten.
    pub fn record_result(&self, quiz_id: i64, score: i32) -> Result<Quiz> {
        let mut quizzes = self.list_quizzes()?;
        let quiz = quizzes
            .iter_mut()
            .find(|q| q.id == quiz_id)
            .ok_or(QuizStorageError::QuizNotFound(quiz_id))?;

        quiz.completed_times += 1;
        quiz.best_score = quiz.best_score.max(score);
        let updated = quiz.clone();

        self.overwrite(&quizzes)?;
        Ok(updated)
    }

    fn overwrite(&self, quizzes: &[Quiz]) -> Result<()> {
        let values = quizzes
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<Value>, _>>()?;
        self.store.overwrite(tables::QUIZZES, values)?;
        Ok(())
    }
}
