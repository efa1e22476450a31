//! The tutor engine: one user turn in, one classified outcome out.
//!
//! Flow per turn: load (once per language) → window → persona → infer →
//! on success append both turns and save.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use proglot_core::{
    CompletionProvider, Conversation, ConversationStore, InferenceError, Language, Turn,
    TutorError,
};

use crate::context_window::{ContextWindow, DEFAULT_WINDOW_SIZE};
use crate::export::FallbackPrompt;
use crate::inference::{Inference, InferenceSettings};
use crate::persona::{kickoff_prompt, Persona};
use crate::session_state::{RequestState, SessionState};

/// What the presentation layer gets back from a turn.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The tutor answered. `warnings` carries non-fatal storage problems.
    Reply {
        assistant_text: String,
        warnings: Vec<String>,
    },
    /// Quota or network trouble: the assembled prompt is handed back for
    /// manual use elsewhere.
    Degraded {
        reason: InferenceError,
        fallback_prompt: String,
        warnings: Vec<String>,
    },
    /// The request cannot succeed without user action. `warnings` still
    /// carries anything reported while loading the history.
    Fatal {
        reason: String,
        warnings: Vec<String>,
    },
}

impl TurnOutcome {
    pub fn is_reply(&self) -> bool {
        matches!(self, TurnOutcome::Reply { .. })
    }
}

/// Owns the per-language sessions and talks to the store and provider.
pub struct Tutor<S, P>
where
    S: ConversationStore + ?Sized,
    P: CompletionProvider + ?Sized,
{
    store: Arc<S>,
    inference: Inference<P>,
    window_size: usize,
    sessions: HashMap<Language, SessionState>,
}

impl<S, P> Tutor<S, P>
where
    S: ConversationStore + ?Sized,
    P: CompletionProvider + ?Sized,
{
    pub fn new(store: Arc<S>, provider: Arc<P>, settings: InferenceSettings) -> Self {
        Self {
            store,
            inference: Inference::new(provider, settings),
            window_size: DEFAULT_WINDOW_SIZE,
            sessions: HashMap::new(),
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Load the language's history into the session cache if not yet there.
    async fn ensure_loaded<'a>(
        sessions: &'a mut HashMap<Language, SessionState>,
        store: &S,
        language: Language,
    ) -> Result<&'a mut SessionState, TutorError> {
        match sessions.entry(language) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let loaded = store.load(language).await?;
                info!(
                    language = %language,
                    turns = loaded.conversation.len(),
                    "Session opened"
                );
                let mut state = SessionState::new(language, loaded.conversation);
                state.load_warning = loaded.warning;
                Ok(entry.insert(state))
            }
        }
    }

    /// Send one user turn for `language_id` and classify the result.
    #[instrument(skip(self, user_text), fields(chars = user_text.len()))]
    pub async fn start_turn(&mut self, language_id: &str, user_text: &str) -> TurnOutcome {
        let language = match Language::parse(language_id) {
            Ok(language) => language,
            Err(e) => {
                warn!(error = %e, "Rejected turn");
                return TurnOutcome::Fatal {
                    reason: e.to_string(),
                    warnings: Vec::new(),
                };
            }
        };

        let window_size = self.window_size;
        let session = match Self::ensure_loaded(&mut self.sessions, &*self.store, language).await {
            Ok(session) => session,
            Err(e) => {
                error!(language = %language, error = %e, "Could not load history");
                return TurnOutcome::Fatal {
                    reason: e.to_string(),
                    warnings: Vec::new(),
                };
            }
        };

        let mut warnings: Vec<String> = session.load_warning.take().into_iter().collect();
        let persona = Persona::for_language(language).instruction();
        let new_turn = Turn::user(user_text);

        session.last_request = RequestState::Sending;
        let window = ContextWindow::build(session.conversation.turns(), window_size);
        if window.omitted() > 0 {
            info!(
                language = %language,
                sent = window.len(),
                omitted = window.omitted(),
                "History trimmed to window"
            );
        }

        match self.inference.infer(&persona, window.turns(), &new_turn).await {
            Ok(reply) => {
                session.conversation.push(new_turn);
                session.conversation.push(Turn::assistant(reply.clone()));
                session.pending_input = None;
                session.last_request = RequestState::Success;
                session.dirty = true;

                match self.store.save(language, &session.conversation).await {
                    Ok(()) => session.dirty = false,
                    Err(e) => {
                        warn!(language = %language, error = %e, "History kept in memory only");
                        warnings.push(format!("history not saved: {e}"));
                    }
                }

                TurnOutcome::Reply {
                    assistant_text: reply,
                    warnings,
                }
            }
            Err(reason) if reason.is_degraded() => {
                let fallback_prompt =
                    FallbackPrompt::render(&persona, window.turns(), Some(&new_turn));
                session.pending_input = Some(user_text.to_string());
                session.last_request = RequestState::Degraded;
                warn!(language = %language, error = %reason, "Falling back to manual export");
                TurnOutcome::Degraded {
                    reason,
                    fallback_prompt,
                    warnings,
                }
            }
            Err(reason) => {
                session.pending_input = Some(user_text.to_string());
                session.last_request = RequestState::Fatal;
                error!(language = %language, error = %reason, "Turn failed");
                TurnOutcome::Fatal {
                    reason: reason.to_string(),
                    warnings,
                }
            }
        }
    }

    /// Cold start: if the language has no history yet, ask the tutor to
    /// open the lesson. Returns `None` when there is history already.
    pub async fn open_lesson(&mut self, language_id: &str) -> Option<TurnOutcome> {
        let language = match Language::parse(language_id) {
            Ok(language) => language,
            Err(e) => {
                return Some(TurnOutcome::Fatal {
                    reason: e.to_string(),
                    warnings: Vec::new(),
                })
            }
        };
        let is_empty = match Self::ensure_loaded(&mut self.sessions, &*self.store, language).await
        {
            Ok(session) => session.conversation.is_empty(),
            Err(e) => {
                return Some(TurnOutcome::Fatal {
                    reason: e.to_string(),
                    warnings: Vec::new(),
                })
            }
        };
        if !is_empty {
            return None;
        }
        Some(self.start_turn(language_id, &kickoff_prompt(language)).await)
    }

    /// Resend the user text retained from a failed request, if any.
    pub async fn retry_pending(&mut self, language_id: &str) -> Option<TurnOutcome> {
        let pending = self.pending_input(language_id)?.to_string();
        Some(self.start_turn(language_id, &pending).await)
    }

    /// Persist a conversation whose earlier save failed. Returns whether
    /// anything needed saving.
    pub async fn retry_save(&mut self, language_id: &str) -> Result<bool, TutorError> {
        let language = Language::parse(language_id)?;
        let Some(session) = self.sessions.get_mut(&language) else {
            return Ok(false);
        };
        if !session.dirty {
            return Ok(false);
        }
        self.store.save(language, &session.conversation).await?;
        session.dirty = false;
        info!(language = %language, turns = session.conversation.len(), "History saved on retry");
        Ok(true)
    }

    /// The full history for a language, loading it if needed.
    pub async fn history(&mut self, language_id: &str) -> Result<Conversation, TutorError> {
        let language = Language::parse(language_id)?;
        Ok(Self::ensure_loaded(&mut self.sessions, &*self.store, language)
            .await?
            .conversation
            .clone())
    }

    /// The turns the next request would carry as context.
    pub async fn window(&mut self, language_id: &str) -> Result<Vec<Turn>, TutorError> {
        let language = Language::parse(language_id)?;
        let window_size = self.window_size;
        let session = Self::ensure_loaded(&mut self.sessions, &*self.store, language).await?;
        Ok(ContextWindow::build(session.conversation.turns(), window_size)
            .turns()
            .to_vec())
    }

    /// Manual-export prompt over the full history, plus any pending input.
    pub async fn export_prompt(&mut self, language_id: &str) -> Result<String, TutorError> {
        let language = Language::parse(language_id)?;
        let persona = Persona::for_language(language).instruction();
        let session = Self::ensure_loaded(&mut self.sessions, &*self.store, language).await?;
        let pending = session.pending_input.as_deref().map(Turn::user);
        Ok(FallbackPrompt::render(
            &persona,
            session.conversation.turns(),
            pending.as_ref(),
        ))
    }

    /// User text retained from the last failed request.
    pub fn pending_input(&self, language_id: &str) -> Option<&str> {
        let language = Language::parse(language_id).ok()?;
        self.sessions.get(&language)?.pending_input.as_deref()
    }

    pub fn request_state(&self, language: Language) -> RequestState {
        self.sessions
            .get(&language)
            .map(|s| s.last_request)
            .unwrap_or_default()
    }

    /// Whether the in-memory history has turns the store has not accepted.
    pub fn has_unsaved(&self, language: Language) -> bool {
        self.sessions.get(&language).is_some_and(|s| s.dirty)
    }

    /// Delete the persisted history and forget the cached session.
    pub async fn clear(&mut self, language_id: &str) -> Result<bool, TutorError> {
        let language = Language::parse(language_id)?;
        let removed = self.store.clear(language).await?;
        self.sessions.remove(&language);
        info!(language = %language, removed, "History cleared");
        Ok(removed)
    }
}
