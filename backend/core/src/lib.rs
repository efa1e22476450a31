pub mod error;
pub mod language;
pub mod traits;
pub mod types;

pub use error::{InferenceError, StorageError, TutorError};
pub use language::Language;
pub use traits::{
    CompletionProvider, CompletionRequest, CompletionResponse, ConversationStore,
    GenerationSettings, Loaded,
};
pub use types::{Conversation, Role, Turn};
