//! Chat transcript storage (one JSON file per session).

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionStorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, SessionStorageError>;

/// A full chat session with all messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<SessionMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single message in a session. Assistant messages keep the raw model
/// output (think blocks and action markers included) for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl SessionMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Lightweight summary for listing sessions without loading all messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    pub id: Uuid,
    pub title: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Storage for chat sessions.
#[derive(Clone)]
pub struct ChatSessionStorage {
    sessions_dir: PathBuf,
}

impl ChatSessionStorage {
    /// Create a session storage under `data_dir`, creating the directory if
    /// needed.
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let sessions_dir = data_dir.join("sessions");
        fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", id))
    }

    /// Save a session using atomic write (write to .tmp then rename).
    pub fn save_session(&self, session: &ChatSession) -> Result<()> {
        let path = self.session_path(session.id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(session)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn get_session(&self, id: Uuid) -> Result<ChatSession> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(SessionStorageError::SessionNotFound(id));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// List all sessions as summaries, most recently updated first.
    pub fn list_sessions(&self) -> Result<Vec<ChatSessionSummary>> {
        let mut summaries = Vec::new();

        for entry in fs::read_dir(&self.sessions_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(session) = serde_json::from_str::<ChatSession>(&content) {
                        summaries.push(ChatSessionSummary {
                            id: session.id,
                            title: session.title,
                            message_count: session.messages.len(),
                            updated_at: session.updated_at,
                        });
                    }
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    pub fn delete_session(&self, id: Uuid) -> Result<()> {
        let path = self.session_path(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
