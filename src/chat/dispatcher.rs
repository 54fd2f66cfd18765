//! Action dispatch: turn an extracted marker into a store mutation.
//!
//! Dispatch fails softly. A malformed payload, a failed validation or an
//! unresolvable deck reference is logged and dropped; it never interrupts
//! stream delivery or other pending actions.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::flashcards::storage::CardDraft;
use crate::flashcards::{FlashcardStorage, FlashcardStorageError, NewDeck, NewFlashcard};
use crate::quizzes::{NewQuiz, QuizStorage, QuizStorageError};
use crate::store::TableStore;

use super::scanner::{ActionKind, ExtractedAction};

#[derive(Error, Debug)]
enum DispatchError {
    #[error("payload parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Flashcards(#[from] FlashcardStorageError),

    #[error("{0}")]
    Quizzes(#[from] QuizStorageError),
}

/// Maps an action name to its handler and executes the store mutation.
pub struct ActionDispatcher {
    flashcards: FlashcardStorage,
    quizzes: QuizStorage,
}

impl ActionDispatcher {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            flashcards: FlashcardStorage::new(Arc::clone(&store)),
            quizzes: QuizStorage::new(store),
        }
    }

    /// Execute one action. Never returns an error to the caller.
    pub fn dispatch(&self, action: &ExtractedAction) {
        let result = match action.kind {
            ActionKind::CreateFlashcards => self.create_flashcards(&action.payload),
            ActionKind::CreateQuiz => self.create_quiz(&action.payload),
            ActionKind::CreateDeck => self.create_deck(&action.payload),
        };

        match result {
            Ok(()) => log::info!("dispatched action {}", action.kind.name()),
            Err(e) => log::warn!("action {} dropped: {}", action.kind.name(), e),
        }
    }

    /// Payload: a single flashcard object or an array of them. Cards are
    /// validated one by one; a bad card is skipped, the rest still commit in
    /// a single batch append. Decks are resolved (or created on the fly) in
    /// payload order, and a deck created mid-batch is cached so later cards
    /// naming it reuse the same deck.
    fn create_flashcards(&self, payload: &str) -> Result<(), DispatchError> {
        let value: Value = serde_json::from_str(payload)?;
        let items: Vec<Value> = match value {
            Value::Array(items) => items,
            single => vec![single],
        };

        let mut deck_cache: HashMap<String, i64> = HashMap::new();
        let mut drafts = Vec::new();

        for item in items {
            let card: NewFlashcard = match serde_json::from_value(item) {
                Ok(card) => card,
                Err(e) => {
                    log::warn!("skipping malformed flashcard: {}", e);
                    continue;
                }
            };
            if card.question.trim().is_empty() || card.answer.trim().is_empty() {
                log::warn!("skipping flashcard with empty question or answer");
                continue;
            }

            let deck_id = match self.resolve_deck(&card, &mut deck_cache) {
                Ok(deck_id) => deck_id,
                Err(e) => {
                    log::warn!("skipping flashcard {:?}: {}", card.question, e);
                    continue;
                }
            };

            drafts.push(CardDraft {
                deck_id,
                question: card.question,
                answer: card.answer,
                difficulty: card.difficulty.unwrap_or_default(),
            });
        }

        self.flashcards.create_cards(drafts)?;
        Ok(())
    }

    fn resolve_deck(
        &self,
        card: &NewFlashcard,
        cache: &mut HashMap<String, i64>,
    ) -> Result<i64, DispatchError> {
        if let Some(deck_id) = card.deck_id {
            // explicit reference must exist
            self.flashcards.get_deck(deck_id)?;
            return Ok(deck_id);
        }

        let name = card
            .deck_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(FlashcardStorageError::InvalidRecord(
                "flashcard has neither deck_id nor deck_name".to_string(),
            ))?;

        let key = name.to_ascii_lowercase();
        if let Some(&deck_id) = cache.get(&key) {
            return Ok(deck_id);
        }

        let deck = match self.flashcards.find_deck_by_name(name)? {
            Some(deck) => deck,
            None => self.flashcards.create_deck(NewDeck {
                name: name.to_string(),
                description: card.deck_description.clone().unwrap_or_default(),
            })?,
        };
        cache.insert(key, deck.id);
        Ok(deck.id)
    }

    fn create_quiz(&self, payload: &str) -> Result<(), DispatchError> {
        let quiz: NewQuiz = serde_json::from_str(payload)?;
        self.quizzes.create_quiz(quiz)?;
        Ok(())
    }

    fn create_deck(&self, payload: &str) -> Result<(), DispatchError> {
        let deck: NewDeck = serde_json::from_str(payload)?;
        self.flashcards.create_deck(deck)?;
        Ok(())
    }
}
