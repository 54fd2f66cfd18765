//! Data models for decks and flashcards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A deck is a named collection of flashcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Card difficulty as emitted by the model and shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Easy
    }
}

/// A flashcard with its spaced-repetition state inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashCard {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub deck_id: i64,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// None until the card has been reviewed at least once.
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review_date: NaiveDate,
    /// Current interval in days.
    #[serde(default)]
    pub interval: i32,
    /// SM-2 ease factor (starts at 2.5).
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f32,
}

fn default_ease_factor() -> f32 {
    2.5
}

impl FlashCard {
    /// A fresh, never-reviewed card due today.
    pub fn new(id: i64, deck_id: i64, question: String, answer: String, difficulty: Difficulty) -> Self {
        Self {
            id,
            question,
            answer,
            deck_id,
            difficulty,
            last_reviewed: None,
            next_review_date: Utc::now().date_naive(),
            interval: 0,
            ease_factor: default_ease_factor(),
        }
    }

    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review_date <= today
    }
}

/// Incoming deck payload (`DECK_JSON` or manual create).
#[derive(Debug, Clone, Deserialize)]
pub struct NewDeck {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Incoming flashcard payload (`FLASHCARDS_JSON` or manual create).
///
/// The target deck is given either by `deck_id` or by `deck_name`; a card
/// naming a deck that does not exist yet triggers on-the-fly deck creation
/// using `deck_name` and the optional `deck_description`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFlashcard {
    pub question: String,
    pub answer: String,
    pub deck_id: Option<i64>,
    pub deck_name: Option<String>,
    pub deck_description: Option<String>,
    pub difficulty: Option<Difficulty>,
}
