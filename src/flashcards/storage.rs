//! Typed storage for decks and flashcards over the table store.
//!
//! Id assignment is sequential per table: `max(existing ids) + 1` for single
//! inserts, `max+1..max+N` in payload order for batches. Ids are never reused
//! while the referenced records exist, so concurrent history stays stable.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::store::{self, tables, StoreError, TableStore};

use super::algorithm::{schedule_review, ReviewOutcome};
use super::models::{Deck, Difficulty, FlashCard, NewDeck};

#[derive(Error, Debug)]
pub enum FlashcardStorageError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deck not found: {0}")]
    DeckNotFound(i64),

    #[error("Card not found: {0}")]
    CardNotFound(i64),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, FlashcardStorageError>;

/// A validated card waiting for id assignment in a batch insert.
#[derive(Debug, Clone)]
pub struct CardDraft {
    pub deck_id: i64,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
}

/// Storage manager for deck and flashcard operations.
pub struct FlashcardStorage {
    store: Arc<dyn TableStore>,
}

impl FlashcardStorage {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    fn decode<T: serde::de::DeserializeOwned>(records: Vec<Value>) -> Result<Vec<T>> {
        records
            .into_iter()
            .map(|r| serde_json::from_value(r).map_err(FlashcardStorageError::from))
            .collect()
    }

    // ==================== Deck Operations ====================

    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        Self::decode(self.store.load(tables::DECKS)?)
    }

    pub fn get_deck(&self, deck_id: i64) -> Result<Deck> {
        self.list_decks()?
            .into_iter()
            .find(|d| d.id == deck_id)
            .ok_or(FlashcardStorageError::DeckNotFound(deck_id))
    }

    /// Look a deck up by name, case-insensitively. First match in store
    /// order wins.
    pub fn find_deck_by_name(&self, name: &str) -> Result<Option<Deck>> {
        Ok(self
            .list_decks()?
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(name)))
    }

    /// Create a new deck with the next sequential id.
    pub fn create_deck(&self, new: NewDeck) -> Result<Deck> {
        if new.name.trim().is_empty() {
            return Err(FlashcardStorageError::InvalidRecord(
                "deck name must not be empty".to_string(),
            ));
        }

        let records = self.store.load(tables::DECKS)?;
        let deck = Deck {
            id: store::next_id(&records),
            name: new.name,
            description: new.description,
        };
        self.store
            .append(tables::DECKS, serde_json::to_value(&deck)?)?;
        Ok(deck)
    }

    pub fn update_deck(&self, deck: &Deck) -> Result<()> {
        let mut decks = self.list_decks()?;
        let pos = decks
            .iter()
            .position(|d| d.id == deck.id)
            .ok_or(FlashcardStorageError::DeckNotFound(deck.id))?;
        decks[pos] = deck.clone();
        self.overwrite_decks(&decks)
    }

    /// Delete a deck and all its cards.
    pub fn delete_deck(&self, deck_id: i64) -> Result<()> {
        let mut decks = self.list_decks()?;
        let before = decks.len();
        decks.retain(|d| d.id != deck_id);
        if decks.len() == before {
            return Err(FlashcardStorageError::DeckNotFound(deck_id));
        }
        self.overwrite_decks(&decks)?;

        let mut cards = self.list_cards(None)?;
        cards.retain(|c| c.deck_id != deck_id);
        self.overwrite_cards(&cards)
    }

    // ==================== Card Operations ====================

    /// List cards, optionally restricted to one deck.
    pub fn list_cards(&self, deck_id: Option<i64>) -> Result<Vec<FlashCard>> {
        let mut cards: Vec<FlashCard> = Self::decode(self.store.load(tables::FLASHCARDS)?)?;
        if let Some(deck_id) = deck_id {
            cards.retain(|c| c.deck_id == deck_id);
        }
        Ok(cards)
    }

    pub fn get_card(&self, card_id: i64) -> Result<FlashCard> {
        self.list_cards(None)?
            .into_iter()
            .find(|c| c.id == card_id)
            .ok_or(FlashcardStorageError::CardNotFound(card_id))
    }

    /// Insert a batch of validated drafts in one append. Ids are assigned
    /// `max+1..max+N` in draft order.
    pub fn create_cards(&self, drafts: Vec<CardDraft>) -> Result<Vec<FlashCard>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.store.load(tables::FLASHCARDS)?;
        let first_id = store::next_id(&records);

        let cards: Vec<FlashCard> = drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                FlashCard::new(
                    first_id + i as i64,
                    d.deck_id,
                    d.question,
                    d.answer,
                    d.difficulty,
                )
            })
            .collect();

        let values = cards
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.store.append_many(tables::FLASHCARDS, values)?;
        Ok(cards)
    }

    pub fn update_card(&self, card: &FlashCard) -> Result<()> {
        let mut cards = self.list_cards(None)?;
        let pos = cards
            .iter()
            .position(|c| c.id == card.id)
            .ok_or(FlashcardStorageError::CardNotFound(card.id))?;
        cards[pos] = card.clone();
        self.overwrite_cards(&cards)
    }

    pub fn delete_card(&self, card_id: i64) -> Result<()> {
        let mut cards = self.list_cards(None)?;
        let before = cards.len();
        cards.retain(|c| c.id != card_id);
        if cards.len() == before {
            return Err(FlashcardStorageError::CardNotFound(card_id));
        }
        self.overwrite_cards(&cards)
    }

    // ==================== Review Operations ====================

    /// Cards due on or before today, oldest due date first.
    pub fn due_cards(&self, deck_id: Option<i64>) -> Result<Vec<FlashCard>> {
        let today = Utc::now().date_naive();
        let mut due: Vec<FlashCard> = self
            .list_cards(deck_id)?
            .into_iter()
            .filter(|c| c.is_due(today))
            .collect();
        due.sort_by_key(|c| c.next_review_date);
        Ok(due)
    }

    /// Apply an SM-2 review to a card and persist the new state.
    pub fn submit_review(&self, card_id: i64, quality: i32) -> Result<FlashCard> {
        let mut card = self.get_card(card_id)?;

        let ReviewOutcome {
            interval,
            ease_factor,
            next_review_date,
        } = schedule_review(&card, quality);

        card.interval = interval;
        card.ease_factor = ease_factor;
        card.next_review_date = next_review_date;
        card.last_reviewed = Some(Utc::now());

        self.update_card(&card)?;
        Ok(card)
    }

    fn overwrite_decks(&self, decks: &[Deck]) -> Result<()> {
        let values = decks
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.store.overwrite(tables::DECKS, values)?;
        Ok(())
    }

    fn overwrite_cards(&self, cards: &[FlashCard]) -> Result<()> {
        let values = cards
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.store.overwrite(tables::FLASHCARDS, values)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn storage() -> FlashcardStorage {
        FlashcardStorage::new(Arc::new(MemoryStore::new()))
    }

    fn draft(deck_id: i64, q: &str) -> CardDraft {
        CardDraft {
            deck_id,
            question: q.to_string(),
            answer: "a".to_string(),
            difficulty: Difficulty::Easy,
        }
    }

    #[test]
    fn test_deck_ids_are_sequential() {
        let storage = storage();
        let a = storage
            .create_deck(NewDeck {
                name: "Biology".into(),
                description: String::new(),
            })
            .unwrap();
        let b = storage
            .create_deck(NewDeck {
                name: "Physics".into(),
                description: String::new(),
            })
            .unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_deck_id_not_reused_after_delete() {
        let storage = storage();
        storage
            .create_deck(NewDeck {
                name: "A".into(),
                description: String::new(),
            })
            .unwrap();
        let b = storage
            .create_deck(NewDeck {
                name: "B".into(),
                description: String::new(),
            })
            .unwrap();
        storage.delete_deck(1).unwrap();

        let c = storage
            .create_deck(NewDeck {
                name: "C".into(),
                description: String::new(),
            })
            .unwrap();
        // max surviving id is 2, so next is 3
        assert_eq!(b.id, 2);
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_find_deck_by_name_is_case_insensitive() {
        let storage = storage();
        storage
            .create_deck(NewDeck {
                name: "JavaScript".into(),
                description: String::new(),
            })
            .unwrap();

        let found = storage.find_deck_by_name("javascript").unwrap();
        assert_eq!(found.map(|d| d.id), Some(1));
        assert!(storage.find_deck_by_name("Rust").unwrap().is_none());
    }

    #[test]
    fn test_empty_deck_name_rejected() {
        let storage = storage();
        let result = storage.create_deck(NewDeck {
            name: "  ".into(),
            description: String::new(),
        });
        assert!(matches!(
            result,
            Err(FlashcardStorageError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_batch_card_ids_in_payload_order() {
        let storage = storage();
        let deck = storage
            .create_deck(NewDeck {
                name: "Math".into(),
                description: String::new(),
            })
            .unwrap();

        storage.create_cards(vec![draft(deck.id, "one")]).unwrap();
        let batch = storage
            .create_cards(vec![draft(deck.id, "two"), draft(deck.id, "three")])
            .unwrap();

        assert_eq!(batch[0].id, 2);
        assert_eq!(batch[1].id, 3);
        assert_eq!(batch[0].question, "two");
    }

    #[test]
    fn test_card_round_trip() {
        let storage = storage();
        let deck = storage
            .create_deck(NewDeck {
                name: "Math".into(),
                description: String::new(),
            })
            .unwrap();
        let created = storage
            .create_cards(vec![CardDraft {
                deck_id: deck.id,
                question: "What is 2+2?".into(),
                answer: "4".into(),
                difficulty: Difficulty::Hard,
            }])
            .unwrap();

        let loaded = storage.get_card(created[0].id).unwrap();
        assert_eq!(loaded, created[0]);
    }

    #[test]
    fn test_delete_deck_cascades_to_cards() {
        let storage = storage();
        let keep = storage
            .create_deck(NewDeck {
                name: "Keep".into(),
                description: String::new(),
            })
            .unwrap();
        let gone = storage
            .create_deck(NewDeck {
                name: "Gone".into(),
                description: String::new(),
            })
            .unwrap();
        storage
            .create_cards(vec![draft(keep.id, "k"), draft(gone.id, "g")])
            .unwrap();

        storage.delete_deck(gone.id).unwrap();

        let cards = storage.list_cards(None).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].deck_id, keep.id);
    }

    #[test]
    fn test_submit_review_updates_srs_state() {
        let storage = storage();
        let deck = storage
            .create_deck(NewDeck {
                name: "Math".into(),
                description: String::new(),
            })
            .unwrap();
        let card = storage.create_cards(vec![draft(deck.id, "q")]).unwrap();

        let reviewed = storage.submit_review(card[0].id, 5).unwrap();
        assert_eq!(reviewed.interval, 1);
        assert!(reviewed.last_reviewed.is_some());
        assert!(reviewed.next_review_date > Utc::now().date_naive());

        // persisted, not just returned
        let loaded = storage.get_card(card[0].id).unwrap();
        assert_eq!(loaded.interval, 1);
    }
}
