//! `proglot-sessions`: per-language conversation persistence.
//!
//! Provides:
//! - `JsonFileStore`: one pretty-printed JSON file per language, replaced atomically
//! - `InMemoryStore`: a process-local store for tests and embedding

pub mod file_store;
pub mod memory_store;

pub use file_store::{history_file_name, legacy_history_file_name, JsonFileStore};
pub use memory_store::InMemoryStore;
