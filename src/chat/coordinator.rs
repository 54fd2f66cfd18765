//! Stream coordination for one chat turn.
//!
//! [`ResponseProcessor`] owns the flush policy: deltas accumulate in a
//! buffer, and everything up to the last newline is scanned, dispatched and
//! released as one visible segment. [`StreamCoordinator`] runs the whole
//! turn: gather context, open the provider stream, pump it through the
//! processor into a bounded channel, and persist the transcript afterwards.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::flashcards::FlashcardStorage;
use crate::llm::{ChatClient, ChatMessage, ModelParams};
use crate::memory::Memory;
use crate::store::TableStore;

use super::dispatcher::ActionDispatcher;
use super::prompt::socratic_tutor_prompt;
use super::scanner::{ScanState, TagScanner};
use super::sessions::{ChatSession, ChatSessionStorage, SessionMessage};

/// Shown to the user when the provider stream cannot be opened or dies
/// mid-response.
const FALLBACK_MESSAGE: &str = "I'm sorry, I encountered an error. Please try again.";

/// How many visible segments may sit unread before the producer blocks.
const SEGMENT_CHANNEL_CAPACITY: usize = 16;

const TITLE_MAX_CHARS: usize = 40;

/// Incremental response pipeline: buffering, scanning, and action dispatch
/// for one assistant response.
pub struct ResponseProcessor {
    scanner: TagScanner,
    dispatcher: ActionDispatcher,
    buffer: String,
    raw: String,
    state: ScanState,
}

impl ResponseProcessor {
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self {
            scanner: TagScanner::new(),
            dispatcher,
            buffer: String::new(),
            raw: String::new(),
            state: ScanState::default(),
        }
    }

    /// Feed one delta. Returns the visible segment released by this delta,
    /// if the buffer reached a newline. Actions found in the flushed segment
    /// are dispatched before the segment is returned.
    pub fn push_delta(&mut self, delta: &str) -> Option<String> {
        self.raw.push_str(delta);
        self.buffer.push_str(delta);

        let flush_end = self.buffer.rfind('\n')? + 1;
        let rest = self.buffer.split_off(flush_end);
        let segment = std::mem::replace(&mut self.buffer, rest);

        let (outcome, state) = self.scanner.process(&segment, self.state);
        self.state = state;
        for action in &outcome.actions {
            self.dispatcher.dispatch(action);
        }

        // an incomplete trailing marker goes back in front of the unflushed
        // remainder and is re-scanned on the next flush
        if !outcome.carry.is_empty() {
            self.buffer.insert_str(0, &outcome.carry);
        }

        (!outcome.clean.is_empty()).then_some(outcome.clean)
    }

    /// Flush whatever is left at end of stream. Never carries.
    pub fn finish(&mut self) -> Option<String> {
        let segment = std::mem::take(&mut self.buffer);
        let (outcome, state) = self.scanner.process_final(&segment, self.state);
        self.state = state;
        for action in &outcome.actions {
            self.dispatcher.dispatch(action);
        }
        (!outcome.clean.is_empty()).then_some(outcome.clean)
    }

    /// The unmodified model output accumulated so far.
    pub fn raw_response(&self) -> &str {
        &self.raw
    }
}

/// Runs chat turns end to end.
pub struct StreamCoordinator {
    client: Arc<dyn ChatClient>,
    store: Arc<dyn TableStore>,
    memory: Arc<dyn Memory>,
    sessions: ChatSessionStorage,
    params: ModelParams,
    user_id: String,
}

impl StreamCoordinator {
    pub fn new(
        client: Arc<dyn ChatClient>,
        store: Arc<dyn TableStore>,
        memory: Arc<dyn Memory>,
        sessions: ChatSessionStorage,
        params: ModelParams,
        user_id: String,
    ) -> Self {
        Self {
            client,
            store,
            memory,
            sessions,
            params,
            user_id,
        }
    }

    /// Start one chat turn. Returns the session id (newly created when
    /// `session_id` is `None`) and a receiver of visible text segments.
    ///
    /// A provider failure surfaces as a single fallback segment, not an
    /// error. A dropped receiver stops the upstream pull; actions already
    /// dispatched stay applied, but the turn is not persisted.
    pub fn open_turn(
        &self,
        session_id: Option<Uuid>,
        user_message: String,
    ) -> (Uuid, mpsc::Receiver<String>) {
        let session = self.resolve_session(session_id, &user_message);
        let id = session.id;

        // context gathering is best-effort
        let memory_snippets = self
            .memory
            .search(&user_message, &self.user_id)
            .unwrap_or_else(|e| {
                log::warn!("memory search failed: {}", e);
                Vec::new()
            });
        let deck_names = FlashcardStorage::new(Arc::clone(&self.store))
            .list_decks()
            .map(|decks| decks.into_iter().map(|d| d.name).collect())
            .unwrap_or_else(|e| {
                log::warn!("deck listing failed: {}", e);
                Vec::new()
            });

        let mut messages = vec![ChatMessage::system(socratic_tutor_prompt(
            &memory_snippets,
            &deck_names,
        ))];
        for message in &session.messages {
            messages.push(ChatMessage {
                role: message.role.clone(),
                content: message.content.clone(),
            });
        }
        messages.push(ChatMessage::user(user_message.clone()));

        let (tx, rx) = mpsc::channel(SEGMENT_CHANNEL_CAPACITY);
        let client = Arc::clone(&self.client);
        let params = self.params.clone();
        let dispatcher = ActionDispatcher::new(Arc::clone(&self.store));
        let memory = Arc::clone(&self.memory);
        let sessions = self.sessions.clone();
        let user_id = self.user_id.clone();

        tokio::spawn(async move {
            let mut stream = match client.open_stream(messages, &params).await {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("failed to open stream: {}", e);
                    let _ = tx.send(FALLBACK_MESSAGE.to_string()).await;
                    return;
                }
            };

            let mut processor = ResponseProcessor::new(dispatcher);

            while let Some(item) = stream.next().await {
                match item {
                    Ok(delta) => {
                        if let Some(segment) = processor.push_delta(&delta) {
                            if tx.send(segment).await.is_err() {
                                // client went away; stop pulling upstream
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("stream died mid-response: {}", e);
                        let _ = tx.send(FALLBACK_MESSAGE.to_string()).await;
                        return;
                    }
                }
            }

            if let Some(tail) = processor.finish() {
                if tx.send(tail).await.is_err() {
                    return;
                }
            }

            persist_turn(
                &sessions,
                &*memory,
                &user_id,
                session,
                &user_message,
                processor.raw_response(),
            );
        });

        (id, rx)
    }

    fn resolve_session(&self, session_id: Option<Uuid>, user_message: &str) -> ChatSession {
        match session_id {
            Some(id) => self.sessions.get_session(id).unwrap_or_else(|e| {
                log::warn!("session {} not loadable, starting fresh: {}", id, e);
                ChatSession::new(title_from(user_message))
            }),
            None => ChatSession::new(title_from(user_message)),
        }
    }
}

/// Persist the completed exchange. Failures are logged; the user already has
/// the response.
fn persist_turn(
    sessions: &ChatSessionStorage,
    memory: &dyn Memory,
    user_id: &str,
    mut session: ChatSession,
    user_message: &str,
    assistant_raw: &str,
) {
    session
        .messages
        .push(SessionMessage::new("user", user_message));
    session
        .messages
        .push(SessionMessage::new("assistant", assistant_raw));
    session.updated_at = chrono::Utc::now();
    if let Err(e) = sessions.save_session(&session) {
        log::warn!("failed to save session {}: {}", session.id, e);
    }

    let turn = [
        ChatMessage::user(user_message),
        ChatMessage::assistant(assistant_raw),
    ];
    if let Err(e) = memory.add(&turn, user_id, &session.id.to_string()) {
        log::warn!("failed to record memory for session {}: {}", session.id, e);
    }
}

fn title_from(user_message: &str) -> String {
    let trimmed = user_message.trim();
    if trimmed.is_empty() {
        return "New chat".to_string();
    }
    trimmed.chars().take(TITLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::flashcards::FlashcardStorage;
    use crate::llm::{LlmError, TokenStream};
    use crate::memory::FileMemory;
    use crate::store::{MemoryStore, TableStore};

    /// Replays a script of deltas; `Err` entries simulate transport faults.
    struct ScriptedClient {
        script: Mutex<Option<Vec<crate::llm::Result<String>>>>,
        fail_open: bool,
    }

    impl ScriptedClient {
        fn new(deltas: Vec<crate::llm::Result<String>>) -> Self {
            Self {
                script: Mutex::new(Some(deltas)),
                fail_open: false,
            }
        }

        fn failing_open() -> Self {
            Self {
                script: Mutex::new(Some(Vec::new())),
                fail_open: true,
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        async fn open_stream(
            &self,
            _messages: Vec<ChatMessage>,
            _params: &ModelParams,
        ) -> crate::llm::Result<TokenStream> {
            if self.fail_open {
                return Err(LlmError::Api("provider error 500".to_string()));
            }
            let deltas = self
                .script
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| LlmError::Api("script already consumed".to_string()))?;
            Ok(Box::pin(futures_util::stream::iter(deltas)))
        }
    }

    fn ok(s: &str) -> crate::llm::Result<String> {
        Ok(s.to_string())
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        coordinator: StreamCoordinator,
        store: Arc<MemoryStore>,
        sessions: ChatSessionStorage,
        memory: Arc<FileMemory>,
    }

    fn fixture(client: ScriptedClient) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let sessions = ChatSessionStorage::new(dir.path().to_path_buf()).unwrap();
        let memory = Arc::new(FileMemory::new(dir.path().to_path_buf()).unwrap());
        let coordinator = StreamCoordinator::new(
            Arc::new(client),
            store.clone() as Arc<dyn TableStore>,
            memory.clone() as Arc<dyn Memory>,
            sessions.clone(),
            ModelParams {
                model: "test-model".to_string(),
                temperature: 0.6,
                max_tokens: 4096,
            },
            "u1".to_string(),
        );
        Fixture {
            _dir: dir,
            coordinator,
            store,
            sessions,
            memory,
        }
    }

    async fn drain(mut rx: mpsc::Receiver<String>) -> Vec<String> {
        let mut segments = Vec::new();
        while let Some(segment) = rx.recv().await {
            segments.push(segment);
        }
        segments
    }

    #[tokio::test]
    async fn test_plain_text_flushed_on_newlines() {
        let f = fixture(ScriptedClient::new(vec![
            ok("Hel"),
            ok("lo wor"),
            ok("ld\nsecond "),
            ok("line"),
        ]));

        let (_, rx) = f.coordinator.open_turn(None, "hi".to_string());
        let segments = drain(rx).await;
        assert_eq!(segments, vec!["Hello world\n", "second line"]);
    }

    #[tokio::test]
    async fn test_think_block_never_reaches_client() {
        let f = fixture(ScriptedClient::new(vec![
            ok("<think>let me pon"),
            ok("der</think>The answer is 4.\n"),
        ]));

        let (_, rx) = f.coordinator.open_turn(None, "2+2?".to_string());
        let segments = drain(rx).await;
        assert_eq!(segments.concat(), "The answer is 4.\n");
    }

    #[tokio::test]
    async fn test_action_split_across_deltas_dispatched_once() {
        let f = fixture(ScriptedClient::new(vec![
            ok("Nice work! //ACTION: CREATE_DECK// //DECK_JSON:\n"),
            ok(" {\"name\":\"Biology\",\"description\":\"cells\"}// Saved it.\n"),
        ]));

        let (_, rx) = f.coordinator.open_turn(None, "make a deck".to_string());
        let segments = drain(rx).await;
        assert_eq!(segments.concat(), "Nice work!  Saved it.\n");

        let flashcards = FlashcardStorage::new(f.store.clone() as Arc<dyn TableStore>);
        let decks = flashcards.list_decks().unwrap();
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].name, "Biology");
    }

    #[tokio::test]
    async fn test_action_applied_before_segment_delivered() {
        let f = fixture(ScriptedClient::new(vec![ok(
            "//ACTION: CREATE_DECK// //DECK_JSON: {\"name\":\"Math\",\"description\":\"\"}// done\n",
        )]));

        let (_, mut rx) = f.coordinator.open_turn(None, "go".to_string());
        let first = rx.recv().await.unwrap();
        assert_eq!(first, " done\n");

        // the mutation is visible no later than the segment that carried it
        let flashcards = FlashcardStorage::new(f.store.clone() as Arc<dyn TableStore>);
        assert_eq!(flashcards.list_decks().unwrap().len(), 1);
        drain(rx).await;
    }

    #[tokio::test]
    async fn test_open_failure_yields_fallback_and_no_transcript() {
        let f = fixture(ScriptedClient::failing_open());

        let (_, rx) = f.coordinator.open_turn(None, "hello".to_string());
        let segments = drain(rx).await;
        assert_eq!(segments, vec![FALLBACK_MESSAGE.to_string()]);
        assert!(f.sessions.list_sessions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_midstream_failure_yields_fallback_and_no_transcript() {
        let f = fixture(ScriptedClient::new(vec![
            ok("partial answer\n"),
            Err(LlmError::Network("connection reset".to_string())),
        ]));

        let (_, rx) = f.coordinator.open_turn(None, "hello".to_string());
        let segments = drain(rx).await;
        assert_eq!(
            segments,
            vec!["partial answer\n".to_string(), FALLBACK_MESSAGE.to_string()]
        );
        assert!(f.sessions.list_sessions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_turn_is_persisted() {
        let raw = "Sure thing.\nHere you go.";
        let f = fixture(ScriptedClient::new(vec![ok(raw)]));

        let (id, rx) = f.coordinator.open_turn(None, "explain closures".to_string());
        drain(rx).await;

        let session = f.sessions.get_session(id).unwrap();
        assert_eq!(session.title, "explain closures");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].content, "explain closures");
        assert_eq!(session.messages[1].content, raw);

        let remembered = f.memory.search("closures", "u1").unwrap();
        assert!(!remembered.is_empty());
    }

    #[tokio::test]
    async fn test_assistant_raw_keeps_markers_in_transcript() {
        let raw = "<think>plan</think>Great! //ACTION: CREATE_DECK// //DECK_JSON: {\"name\":\"JS\",\"description\":\"\"}// Saved.\n";
        let f = fixture(ScriptedClient::new(vec![ok(raw)]));

        let (id, rx) = f.coordinator.open_turn(None, "save a deck".to_string());
        let segments = drain(rx).await;
        assert_eq!(segments.concat(), "Great!  Saved.\n");

        let session = f.sessions.get_session(id).unwrap();
        assert_eq!(session.messages[1].content, raw);
    }

    #[tokio::test]
    async fn test_second_turn_reuses_session() {
        let f = fixture(ScriptedClient::new(vec![ok("first answer\n")]));
        let (id, rx) = f.coordinator.open_turn(None, "first".to_string());
        drain(rx).await;

        // a new coordinator with a fresh script, same session store
        let f2 = {
            let client = ScriptedClient::new(vec![ok("second answer\n")]);
            StreamCoordinator::new(
                Arc::new(client),
                f.store.clone() as Arc<dyn TableStore>,
                f.memory.clone() as Arc<dyn Memory>,
                f.sessions.clone(),
                ModelParams {
                    model: "test-model".to_string(),
                    temperature: 0.6,
                    max_tokens: 4096,
                },
                "u1".to_string(),
            )
        };
        let (id2, rx) = f2.open_turn(Some(id), "second".to_string());
        drain(rx).await;

        assert_eq!(id, id2);
        let session = f.sessions.get_session(id).unwrap();
        assert_eq!(session.messages.len(), 4);
    }

    #[test]
    fn test_processor_holds_text_until_newline() {
        let dispatcher = ActionDispatcher::new(Arc::new(MemoryStore::new()) as Arc<dyn TableStore>);
        let mut processor = ResponseProcessor::new(dispatcher);

        assert_eq!(processor.push_delta("no newline yet"), None);
        assert_eq!(
            processor.push_delta(" now\nleftover"),
            Some("no newline yet now\n".to_string())
        );
        assert_eq!(processor.finish(), Some("leftover".to_string()));
        assert_eq!(processor.raw_response(), "no newline yet now\nleftover");
    }

    #[test]
    fn test_processor_carry_rejoins_unflushed_remainder() {
        let dispatcher = ActionDispatcher::new(Arc::new(MemoryStore::new()) as Arc<dyn TableStore>);
        let mut processor = ResponseProcessor::new(dispatcher);

        // marker spans the newline flush, payload finishes later
        assert_eq!(
            processor.push_delta("ok //ACTION: CREATE_DECK// //DECK_JSON:\n{\"name\":"),
            Some("ok ".to_string())
        );
        assert_eq!(
            processor.push_delta("\"Bio\",\"description\":\"\"}// done\n"),
            Some(" done\n".to_string())
        );
        assert_eq!(processor.finish(), None);
    }
}
