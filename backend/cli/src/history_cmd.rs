//! Offline history commands: these never call the model.

use anyhow::{bail, Context, Result};
use tracing::info;

use proglot_agent::{ContextWindow, FallbackPrompt, Persona};
use proglot_core::{Conversation, ConversationStore, Language};
use proglot_sessions::JsonFileStore;

use crate::terminal_output::{
    note_info, note_success, note_warn, print_transcript, render_table, Column,
};

/// The word `clear` must be confirmed with.
pub const CLEAR_CONFIRMATION: &str = "delete";

async fn load(store: &JsonFileStore, language: Language) -> Result<Conversation> {
    let loaded = store
        .load(language)
        .await
        .with_context(|| format!("Failed to read {} history", language.name()))?;
    if let Some(warning) = loaded.warning {
        note_warn(&warning);
    }
    Ok(loaded.conversation)
}

/// Print the context window, or the whole history with `all`.
pub async fn run_history(
    store: &JsonFileStore,
    language: Language,
    window_size: usize,
    all: bool,
) -> Result<()> {
    let conversation = load(store, language).await?;
    if conversation.is_empty() {
        note_info(&format!("No {} history yet.", language.name()));
        return Ok(());
    }
    if all {
        print_transcript(conversation.turns(), 0);
    } else {
        let window = ContextWindow::build(conversation.turns(), window_size);
        print_transcript(window.turns(), window.omitted());
    }
    Ok(())
}

/// Render the manual-export prompt for the full history.
pub async fn export_prompt(store: &JsonFileStore, language: Language) -> Result<String> {
    let conversation = load(store, language).await?;
    let instruction = Persona::for_language(language).instruction();
    Ok(FallbackPrompt::render(&instruction, conversation.turns(), None))
}

pub async fn run_export(store: &JsonFileStore, language: Language) -> Result<()> {
    println!("{}", export_prompt(store, language).await?);
    Ok(())
}

pub async fn run_clear(
    store: &JsonFileStore,
    language: Language,
    confirm: Option<&str>,
) -> Result<()> {
    let confirmed = confirm.is_some_and(|c| c.trim().eq_ignore_ascii_case(CLEAR_CONFIRMATION));
    if !confirmed {
        bail!(
            "refusing to delete {} history; pass --confirm {CLEAR_CONFIRMATION}",
            language.name()
        );
    }
    let removed = store
        .clear(language)
        .await
        .with_context(|| format!("Failed to delete {} history", language.name()))?;
    info!(language = %language, removed, "History cleared from CLI");
    if removed {
        note_success(&format!("{} history deleted.", language.name()));
    } else {
        note_info(&format!("No {} history to delete.", language.name()));
    }
    Ok(())
}

pub fn run_languages() {
    let rows: Vec<Vec<String>> = Language::ALL
        .iter()
        .map(|lang| {
            vec![
                lang.code().to_string(),
                lang.name().to_string(),
                lang.turkish_name().to_string(),
            ]
        })
        .collect();
    let columns = [
        Column::left("Code"),
        Column::left("Language"),
        Column::left("Türkçe"),
    ];
    print!("{}", render_table(&columns, &rows));
}
