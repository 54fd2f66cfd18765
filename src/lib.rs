//! SenpAI: a Socratic tutoring backend.
//!
//! Streams model output to the client while transparently stripping
//! `<think>` reasoning and executing embedded action markers against the
//! local flashcard, deck and quiz store.

use std::sync::Arc;

pub mod chat;
pub mod config;
pub mod flashcards;
pub mod llm;
pub mod memory;
pub mod quizzes;
pub mod store;

use chat::{ChatSessionStorage, SessionStorageError, StreamCoordinator};
use config::Config;
use flashcards::FlashcardStorage;
use llm::{HttpChatClient, ModelParams};
use memory::{FileMemory, MemoryError};
use quizzes::QuizStorage;
use store::{JsonFileStore, StoreError, TableStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitError {
    #[error("store initialization failed: {0}")]
    Store(#[from] StoreError),

    #[error("session storage initialization failed: {0}")]
    Sessions(#[from] SessionStorageError),

    #[error("memory initialization failed: {0}")]
    Memory(#[from] MemoryError),
}

/// The assembled application: one store, one memory, one provider client.
pub struct Tutor {
    store: Arc<dyn TableStore>,
    sessions: ChatSessionStorage,
    coordinator: StreamCoordinator,
}

impl Tutor {
    /// Wire up all components from configuration.
    pub fn new(config: &Config) -> Result<Self, InitError> {
        let store: Arc<dyn TableStore> = Arc::new(JsonFileStore::new(config.data_dir.clone())?);
        let sessions = ChatSessionStorage::new(config.data_dir.clone())?;
        let memory = Arc::new(FileMemory::new(config.data_dir.clone())?);
        let client = Arc::new(HttpChatClient::new(
            config.api_key.clone(),
            config.base_url.clone(),
        ));

        let coordinator = StreamCoordinator::new(
            client,
            Arc::clone(&store),
            memory,
            sessions.clone(),
            ModelParams {
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
            config.user_id.clone(),
        );

        Ok(Self {
            store,
            sessions,
            coordinator,
        })
    }

    /// Start a chat turn; see [`StreamCoordinator::open_turn`].
    pub fn chat(
        &self,
        session_id: Option<uuid::Uuid>,
        user_message: String,
    ) -> (uuid::Uuid, tokio::sync::mpsc::Receiver<String>) {
        self.coordinator.open_turn(session_id, user_message)
    }

    pub fn flashcards(&self) -> FlashcardStorage {
        FlashcardStorage::new(Arc::clone(&self.store))
    }

    pub fn quizzes(&self) -> QuizStorage {
        QuizStorage::new(Arc::clone(&self.store))
    }

    pub fn sessions(&self) -> &ChatSessionStorage {
        &self.sessions
    }
}
