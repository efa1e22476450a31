//! ProGlot tutor engine.
//!
//! Context window handling, persona assembly, the inference call wrapper,
//! manual export, and the `Tutor` that ties them to a conversation store.

pub mod context_window;
pub mod export;
pub mod inference;
pub mod persona;
pub mod session_state;
pub mod tutor;

pub use context_window::{ContextWindow, DEFAULT_WINDOW_SIZE};
pub use export::FallbackPrompt;
pub use inference::{Inference, InferenceSettings, RetryPolicy};
pub use persona::{assemble_persona, kickoff_prompt, Persona};
pub use session_state::{RequestState, SessionState};
pub use tutor::{Tutor, TurnOutcome};
