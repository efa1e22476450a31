//! Interactive lesson REPL and one-shot `send`.

use std::process::ExitCode;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use proglot_agent::{Tutor, TurnOutcome};
use proglot_core::{CompletionProvider, Language, Turn};
use proglot_sessions::JsonFileStore;

use crate::terminal_output::{
    note_error, note_info, note_success, note_warn, print_block, print_transcript, print_turn,
    supports_color, BOLD, CYAN, RESET,
};

pub type CliTutor = Tutor<JsonFileStore, dyn CompletionProvider>;

/// Exit status for a degraded `send`.
const DEGRADED_EXIT: u8 = 2;

/// What the REPL does with one input line.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Say(&'a str),
    History,
    Export,
    Save,
    Retry,
    Help,
    Quit,
    Unknown(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(ReplCommand::Say(line));
        };
        Some(match command.trim().to_lowercase().as_str() {
            "history" => ReplCommand::History,
            "export" => ReplCommand::Export,
            "save" => ReplCommand::Save,
            "retry" => ReplCommand::Retry,
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Presented {
    Reply,
    Degraded,
    Fatal(String),
}

/// Print an outcome and report how it ended.
fn present(outcome: &TurnOutcome) -> Presented {
    match outcome {
        TurnOutcome::Reply {
            assistant_text,
            warnings,
        } => {
            println!();
            print_turn(&Turn::assistant(assistant_text.as_str()));
            println!();
            for warning in warnings {
                note_warn(&format!("{warning} (use /save to try again)"));
            }
            Presented::Reply
        }
        TurnOutcome::Degraded {
            reason,
            fallback_prompt,
            warnings,
        } => {
            for warning in warnings {
                note_warn(warning);
            }
            note_warn(&format!("The tutor is unavailable right now: {reason}"));
            print_block(
                "Paste this prompt into another assistant to keep going:",
                fallback_prompt,
            );
            note_info("Your message was kept. Use /retry to send it again.");
            Presented::Degraded
        }
        TurnOutcome::Fatal { reason, warnings } => {
            for warning in warnings {
                note_warn(warning);
            }
            note_error(reason);
            Presented::Fatal(reason.clone())
        }
    }
}

fn print_help() {
    println!("  /history  show the turns sent as context");
    println!("  /export   print the full conversation as a portable prompt");
    println!("  /save     retry saving history after a disk error");
    println!("  /retry    resend the message from a failed request");
    println!("  /quit     leave the lesson");
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    if supports_color() {
        stdout
            .write_all(format!("{CYAN}{BOLD}you>{RESET} ").as_bytes())
            .await?;
    } else {
        stdout.write_all(b"you> ").await?;
    }
    stdout.flush().await?;
    Ok(())
}

/// Run the interactive lesson until `/quit` or end of input.
pub async fn run_chat(tutor: &mut CliTutor, language: Language) -> Result<()> {
    let id = language.code();
    note_info(&format!(
        "{} lesson ({}). Type /help for commands.",
        language.name(),
        language.turkish_name()
    ));

    let history = tutor.history(id).await?;
    let recent = tutor.window(id).await?;
    print_transcript(&recent, history.len() - recent.len());

    if let Some(outcome) = tutor.open_lesson(id).await {
        present(&outcome);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt().await?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let Some(command) = ReplCommand::parse(&line) else {
            continue;
        };
        match command {
            ReplCommand::Say(text) => {
                present(&tutor.start_turn(id, text).await);
            }
            ReplCommand::History => {
                let window = tutor.window(id).await?;
                let total = tutor.history(id).await?.len();
                print_transcript(&window, total - window.len());
            }
            ReplCommand::Export => {
                let prompt = tutor.export_prompt(id).await?;
                print_block("Conversation export:", &prompt);
            }
            ReplCommand::Save => match tutor.retry_save(id).await {
                Ok(true) => note_success("History saved."),
                Ok(false) => note_info("Nothing to save."),
                Err(e) => note_error(&format!("Still cannot save: {e}")),
            },
            ReplCommand::Retry => match tutor.retry_pending(id).await {
                Some(outcome) => {
                    present(&outcome);
                }
                None => note_info("No failed message to resend."),
            },
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(input) => {
                note_warn(&format!("Unknown command {input}. Type /help for commands."));
            }
        }
    }

    if tutor.has_unsaved(language) {
        match tutor.retry_save(id).await {
            Ok(_) => note_success("History saved."),
            Err(e) => note_error(&format!("Leaving with unsaved history: {e}")),
        }
    }
    info!(language = %language, "Lesson closed");
    Ok(())
}

/// Send a single turn. Fatal outcomes become errors so the exit code is non-zero.
pub async fn run_send(tutor: &mut CliTutor, language: Language, text: &str) -> Result<ExitCode> {
    if text.trim().is_empty() {
        bail!("nothing to send");
    }
    match present(&tutor.start_turn(language.code(), text).await) {
        Presented::Reply => Ok(ExitCode::SUCCESS),
        Presented::Degraded => Ok(ExitCode::from(DEGRADED_EXIT)),
        Presented::Fatal(reason) => bail!(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use proglot_agent::InferenceSettings;
    use proglot_core::{ConversationStore, InferenceError};
    use proglot_providers::MockProvider;

    fn tutor_with(dir: &std::path::Path, provider: MockProvider) -> CliTutor {
        let provider: Arc<dyn CompletionProvider> = Arc::new(provider);
        Tutor::new(
            Arc::new(JsonFileStore::new(dir)),
            provider,
            InferenceSettings::default(),
        )
    }

    #[test]
    fn parses_repl_input() {
        assert_eq!(ReplCommand::parse("   "), None);
        assert_eq!(
            ReplCommand::parse(" Ciao, come stai? "),
            Some(ReplCommand::Say("Ciao, come stai?"))
        );
        assert_eq!(ReplCommand::parse("/EXPORT"), Some(ReplCommand::Export));
        assert_eq!(ReplCommand::parse("/q"), Some(ReplCommand::Quit));
        assert_eq!(
            ReplCommand::parse("/undo"),
            Some(ReplCommand::Unknown("/undo"))
        );
    }

    #[tokio::test]
    async fn send_reply_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(dir.path(), MockProvider::new("mock").with_response("Ciao!"));

        let code = run_send(&mut tutor, Language::Italian, "Ciao").await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let stored = JsonFileStore::new(dir.path())
            .load(Language::Italian)
            .await
            .unwrap();
        assert_eq!(stored.conversation.len(), 2);
        assert_eq!(stored.conversation.turns()[1].text(), "Ciao!");
    }

    #[tokio::test]
    async fn send_exit_codes_follow_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = tutor_with(
            dir.path(),
            MockProvider::new("mock").with_script(vec![
                Err(InferenceError::QuotaExceeded("daily limit".into())),
                Err(InferenceError::Auth("API key not valid".into())),
            ]),
        );

        let code = run_send(&mut tutor, Language::Spanish, "Hola").await.unwrap();
        assert_eq!(code, ExitCode::from(DEGRADED_EXIT));

        assert!(run_send(&mut tutor, Language::Spanish, "Hola").await.is_err());
        assert!(run_send(&mut tutor, Language::Spanish, "  ").await.is_err());
    }
}
