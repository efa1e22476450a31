pub mod classify;
pub mod gemini;
pub mod mock;
pub mod openrouter;

pub use classify::{classify_status, classify_transport};
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openrouter::OpenRouterProvider;
