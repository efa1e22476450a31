//! Per-language session state held by the tutor between turns.

use proglot_core::{Conversation, Language};

/// Lifecycle of the most recent request for a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Sending,
    Success,
    Degraded,
    Fatal,
}

/// In-memory view of one language's lesson.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub language: Language,
    /// Full, un-windowed conversation.
    pub conversation: Conversation,
    /// True when the conversation has turns the store has not accepted yet.
    pub dirty: bool,
    /// User text from a request that did not complete.
    pub pending_input: Option<String>,
    pub last_request: RequestState,
    /// Warning from loading (e.g. a corrupt file), reported once.
    pub load_warning: Option<String>,
}

impl SessionState {
    pub fn new(language: Language, conversation: Conversation) -> Self {
        Self {
            language,
            conversation,
            dirty: false,
            pending_input: None,
            last_request: RequestState::Idle,
            load_warning: None,
        }
    }
}
