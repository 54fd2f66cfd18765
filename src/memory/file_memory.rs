//! JSON-file snippet memory with keyword-overlap ranking.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

use super::{Memory, Result};

/// How many snippets a search returns at most.
const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snippet {
    user_id: String,
    session_id: String,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

/// Memory backed by a single `memory.json` file.
pub struct FileMemory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMemory {
    /// Create a file memory under `data_dir`, creating the directory if
    /// needed.
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            path: data_dir.join("memory.json"),
            write_lock: Mutex::new(()),
        })
    }

    fn read_snippets(&self) -> Result<Vec<Snippet>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_snippets(&self, snippets: &[Snippet]) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(snippets)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_string)
        .collect()
}

impl Memory for FileMemory {
    fn search(&self, query: &str, user_id: &str) -> Result<Vec<String>> {
        let query_words = keywords(query);
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, DateTime<Utc>, String)> = self
            .read_snippets()?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .filter_map(|s| {
                let overlap = keywords(&s.content).intersection(&query_words).count();
                (overlap > 0).then(|| (overlap, s.created_at, s.content))
            })
            .collect();

        // highest overlap first, newest breaking ties
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        Ok(scored
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, _, content)| content)
            .collect())
    }

    fn add(&self, turn: &[ChatMessage], user_id: &str, session_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut snippets = self.read_snippets()?;
        let now = Utc::now();
        for message in turn {
            if message.content.trim().is_empty() {
                continue;
            }
            snippets.push(Snippet {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                role: message.role.clone(),
                content: message.content.clone(),
                created_at: now,
            });
        }
        self.write_snippets(&snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> (tempfile::TempDir, FileMemory) {
        let dir = tempfile::tempdir().unwrap();
        let memory = FileMemory::new(dir.path().to_path_buf()).unwrap();
        (dir, memory)
    }

    #[test]
    fn test_search_empty_memory() {
        let (_dir, memory) = memory();
        assert!(memory.search("closures", "u1").unwrap().is_empty());
    }

    #[test]
    fn test_add_then_search_finds_relevant_snippet() {
        let (_dir, memory) = memory();
        memory
            .add(
                &[
                    ChatMessage::user("what are javascript closures?"),
                    ChatMessage::assistant("A closure remembers its scope."),
                ],
                "u1",
                "s1",
            )
            .unwrap();
        memory
            .add(&[ChatMessage::user("tell me about mitochondria")], "u1", "s2")
            .unwrap();

        let results = memory.search("explain closures again", "u1").unwrap();
        assert!(!results.is_empty());
        assert!(results[0].contains("closure"));
        assert!(results.iter().all(|r| !r.contains("mitochondria")));
    }

    #[test]
    fn test_search_is_scoped_to_user() {
        let (_dir, memory) = memory();
        memory
            .add(&[ChatMessage::user("my favorite topic is entropy")], "u1", "s1")
            .unwrap();

        assert!(memory.search("entropy", "u2").unwrap().is_empty());
        assert_eq!(memory.search("entropy", "u1").unwrap().len(), 1);
    }
}
