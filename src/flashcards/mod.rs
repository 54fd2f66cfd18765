//! Flashcard decks and spaced repetition.
//!
//! This module provides:
//! - Deck management (named collections of flashcards)
//! - Flashcard CRUD with sequential id assignment
//! - SM-2 spaced repetition scheduling

pub mod algorithm;
pub mod models;
pub mod storage;

pub use models::{Deck, Difficulty, FlashCard, NewDeck, NewFlashcard};
pub use storage::{FlashcardStorage, FlashcardStorageError};
