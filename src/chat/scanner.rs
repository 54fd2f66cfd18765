//! Tag scanner for the model output stream.
//!
//! Two kinds of inline markup arrive interleaved with prose:
//! - think blocks, `<think>...</think>`: internal reasoning, never shown;
//! - action markers, `//ACTION: NAME// //KEY: <json>//`: store mutations,
//!   extracted and stripped from the visible text.
//!
//! The scanner is a pure function over one flushed segment plus the single
//! piece of cross-chunk state (`in_think_block`). Action extraction always
//! runs first on the raw segment, so an action the model emits inside a think
//! block is still extracted; only its textual trace is swallowed afterwards.

use regex::Regex;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Actions the model may embed in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateFlashcards,
    CreateQuiz,
    CreateDeck,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::CreateFlashcards,
        ActionKind::CreateQuiz,
        ActionKind::CreateDeck,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::CreateFlashcards => "CREATE_FLASHCARDS",
            ActionKind::CreateQuiz => "CREATE_QUIZ",
            ActionKind::CreateDeck => "CREATE_DECK",
        }
    }

    pub fn payload_key(self) -> &'static str {
        match self {
            ActionKind::CreateFlashcards => "FLASHCARDS_JSON",
            ActionKind::CreateQuiz => "QUIZ_JSON",
            ActionKind::CreateDeck => "DECK_JSON",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// One extracted action: which kind, and the raw JSON payload text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAction {
    pub kind: ActionKind,
    pub payload: String,
}

/// Cross-chunk scanner state. `in_think_block` is the only state that has to
/// survive between flushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub in_think_block: bool,
}

/// Result of scanning one segment.
#[derive(Debug, Default, PartialEq)]
pub struct ScanOutcome {
    /// User-visible text, in order.
    pub clean: String,
    /// Complete actions found, in left-to-right discovery order.
    pub actions: Vec<ExtractedAction>,
    /// Trailing text that might be the start of an action marker whose rest
    /// has not arrived yet. Must be put back in front of the buffer and
    /// re-scanned on the next flush. Always empty for a final flush.
    pub carry: String,
}

/// Compiled patterns for the recognized actions.
pub struct TagScanner {
    patterns: Vec<(ActionKind, Regex)>,
    opener: Regex,
}

impl TagScanner {
    pub fn new() -> Self {
        let patterns = ActionKind::ALL
            .into_iter()
            .map(|kind| {
                // payload runs to the next `//`, the action's hard boundary
                let pattern = format!(
                    r"(?s)//ACTION:\s*{}//\s*//{}:\s*(.*?)//",
                    kind.name(),
                    kind.payload_key()
                );
                let regex = Regex::new(&pattern).expect("action pattern must compile");
                (kind, regex)
            })
            .collect();

        let opener =
            Regex::new(r"^//ACTION:\s*([A-Za-z_]+)\s*//").expect("opener pattern must compile");

        Self { patterns, opener }
    }

    /// Scan one mid-stream segment. An incomplete trailing action marker is
    /// returned in `carry` instead of being emitted.
    pub fn process(&self, segment: &str, state: ScanState) -> (ScanOutcome, ScanState) {
        self.scan(segment, state, false)
    }

    /// Scan the final segment at end of stream. Nothing is carried: an
    /// action marker that is still incomplete can never be completed, so it
    /// passes through as plain text.
    pub fn process_final(&self, segment: &str, state: ScanState) -> (ScanOutcome, ScanState) {
        self.scan(segment, state, true)
    }

    fn scan(&self, segment: &str, state: ScanState, at_end: bool) -> (ScanOutcome, ScanState) {
        let mut text = segment.to_string();
        let mut actions = Vec::new();

        // Phase 1: eager action extraction on the raw segment, earliest match
        // first, re-scanning after each removal.
        while let Some((range, action)) = self.earliest_match(&text) {
            actions.push(action);
            text.replace_range(range, "");
        }

        // Hold back a trailing marker-in-progress so a payload split across
        // flush boundaries is not leaked as prose.
        let carry = if at_end {
            String::new()
        } else {
            match self.incomplete_marker_start(&text) {
                Some(idx) => text.split_off(idx),
                None => String::new(),
            }
        };

        // Phase 2: think-block stripping, threading the state through.
        let (clean, in_think_block) = strip_think_blocks(&text, state.in_think_block);

        (
            ScanOutcome {
                clean,
                actions,
                carry,
            },
            ScanState { in_think_block },
        )
    }

    fn earliest_match(&self, text: &str) -> Option<(std::ops::Range<usize>, ExtractedAction)> {
        let mut best: Option<(std::ops::Range<usize>, ExtractedAction)> = None;
        for (kind, regex) in &self.patterns {
            if let Some(caps) = regex.captures(text) {
                let whole = caps.get(0).expect("match has a whole-group");
                if best.as_ref().map_or(true, |(r, _)| whole.start() < r.start) {
                    best = Some((
                        whole.range(),
                        ExtractedAction {
                            kind: *kind,
                            payload: caps
                                .get(1)
                                .map(|m| m.as_str().trim().to_string())
                                .unwrap_or_default(),
                        },
                    ));
                }
            }
        }
        best
    }

    /// Position of a trailing `//ACTION:` that could still grow into a
    /// recognized marker. A completed opener with an unknown action name is
    /// not held: it will never match, so it flows through as text.
    fn incomplete_marker_start(&self, text: &str) -> Option<usize> {
        let idx = text.rfind("//ACTION:")?;
        match self.opener.captures(&text[idx..]) {
            Some(caps) => ActionKind::from_name(&caps[1]).map(|_| idx),
            // Opener itself still arriving
            None => Some(idx),
        }
    }
}

impl Default for TagScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk the segment left to right, dropping everything between think tags.
/// Text inside an unterminated `<think>` is discarded, and the open state is
/// reported back so the next segment continues being discarded.
fn strip_think_blocks(segment: &str, mut in_think: bool) -> (String, bool) {
    let mut out = String::new();
    let mut rest = segment;

    loop {
        if in_think {
            match rest.find(THINK_CLOSE) {
                Some(i) => {
                    rest = &rest[i + THINK_CLOSE.len()..];
                    in_think = false;
                }
                None => break,
            }
        } else {
            match rest.find(THINK_OPEN) {
                Some(i) => {
                    out.push_str(&rest[..i]);
                    rest = &rest[i + THINK_OPEN.len()..];
                    in_think = true;
                }
                None => {
                    out.push_str(rest);
                    break;
                }
            }
        }
    }

    (out, in_think)
}
