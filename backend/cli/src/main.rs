mod chat_cmd;
mod config;
mod history_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use proglot_agent::Tutor;
use proglot_config::ProGlotConfig;
use proglot_core::Language;
use proglot_sessions::JsonFileStore;

use chat_cmd::CliTutor;
use terminal_output::{note_error, note_success};

#[derive(Parser)]
#[command(name = "proglot")]
#[command(about = "ProGlot: a patient language tutor in your terminal")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ~/.proglot/config.yaml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the per-language history files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive lesson
    Chat {
        /// Language code or name (it, es, de, fr, ja, en)
        #[arg(short, long, default_value = "it")]
        lang: String,
    },
    /// Send one message and print the tutor's reply
    Send {
        #[arg(short, long, default_value = "it")]
        lang: String,
        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Show the turns the next request would send, or everything with --all
    History {
        #[arg(short, long, default_value = "it")]
        lang: String,
        #[arg(long)]
        all: bool,
    },
    /// Print the conversation as a prompt for use in another chat assistant
    Export {
        #[arg(short, long, default_value = "it")]
        lang: String,
    },
    /// Delete the saved history of one language
    Clear {
        #[arg(short, long)]
        lang: String,
        /// Type `delete` to confirm
        #[arg(long)]
        confirm: Option<String>,
    },
    /// List the supported languages
    Languages,
    /// Show the effective configuration (secrets redacted)
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref(), cli.data_dir.clone()).await?;
    let log_dir = config.log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("cannot create log directory {}: {e}", log_dir.display());
    } else {
        proglot_logging::init_logger(&log_dir, config.log_level());
    }
    for warning in proglot_config::validate(&config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    info!(data_dir = %config.data_dir().display(), "ProGlot starting");

    let store = JsonFileStore::new(config.data_dir());

    match cli.command {
        Commands::Chat { lang } => {
            let language = Language::parse(&lang)?;
            let mut tutor = build_tutor(&config, store)?;
            chat_cmd::run_chat(&mut tutor, language).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Send { lang, text } => {
            let language = Language::parse(&lang)?;
            let mut tutor = build_tutor(&config, store)?;
            chat_cmd::run_send(&mut tutor, language, &text.join(" ")).await
        }
        Commands::History { lang, all } => {
            let language = Language::parse(&lang)?;
            history_cmd::run_history(&store, language, config.window_size(), all).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Export { lang } => {
            history_cmd::run_export(&store, Language::parse(&lang)?).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Clear { lang, confirm } => {
            let language = Language::parse(&lang)?;
            history_cmd::run_clear(&store, language, confirm.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Languages => {
            history_cmd::run_languages();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { init } => {
            show_config(&config)?;
            if init {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => proglot_config::config_file_path(&proglot_config::config_dir()),
                };
                // Keep the key itself out of the file.
                let mut on_disk = config.clone();
                on_disk.api_key = Some(format!("${{{}}}", config.provider.api_key_env()));
                proglot_config::write_config(&on_disk, &path).await?;
                note_success(&format!("Wrote {}", path.display()));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_tutor(config: &ProGlotConfig, store: JsonFileStore) -> Result<CliTutor> {
    config::require_valid(config)?;
    let provider = config::build_provider(config)?;
    let settings = config::inference_settings(config);
    info!(
        window = config.window_size(),
        timeout = %config::describe_timeout(settings.timeout),
        "Tutor configured"
    );
    Ok(Tutor::new(Arc::new(store), provider, settings).with_window_size(config.window_size()))
}

fn show_config(config: &ProGlotConfig) -> Result<()> {
    let redacted = proglot_config::redact(config);
    let text = serde_json::to_string_pretty(&redacted).context("Failed to render config")?;
    println!("{text}");
    Ok(())
}
