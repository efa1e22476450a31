use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, StorageError};
use crate::language::Language;
use crate::types::{Conversation, Turn};

/// A text-completion backend (Gemini, OpenRouter, a test double, ...).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name (e.g., "gemini", "openrouter").
    fn name(&self) -> &str;

    /// Send the system instruction and ordered messages, return the reply text.
    async fn complete(&self, request: &CompletionRequest)
        -> Result<CompletionResponse, InferenceError>;
}

/// Sampling parameters forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

/// Request to a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_instruction: String,
    /// Windowed history followed by the new user turn.
    pub messages: Vec<Turn>,
    pub generation: GenerationSettings,
}

/// Response from a completion provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// Result of loading a conversation. A corrupt record is not an error:
/// it yields an empty conversation plus a warning for the caller.
#[derive(Debug, Clone, Default)]
pub struct Loaded {
    pub conversation: Conversation,
    pub warning: Option<String>,
}

impl Loaded {
    pub fn clean(conversation: Conversation) -> Self {
        Self {
            conversation,
            warning: None,
        }
    }
}

/// Durable per-language conversation storage. One record per language.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load the persisted history; a missing record is an empty conversation.
    async fn load(&self, language: Language) -> Result<Loaded, StorageError>;

    /// Replace the persisted history atomically.
    async fn save(&self, language: Language, conversation: &Conversation)
        -> Result<(), StorageError>;

    /// Delete the persisted history. Returns whether a record existed.
    async fn clear(&self, language: Language) -> Result<bool, StorageError>;
}
