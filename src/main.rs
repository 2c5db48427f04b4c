//! lyricgen - A terminal lyric and poem generator.
//!
//! Takes a short prompt, frames it as a song or poem request, and sends it to
//! a chat-completions API. Results are shown in a full-screen TUI with a
//! session history and save-to-file, or printed directly in pipe mode.

mod completion;
mod config;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use completion::{CompletionClient, GenerationRequest, Mode};
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lyricgen")]
#[command(author, version, about = "Generate song lyrics and poems from a short prompt")]
#[command(long_about = "Generate song lyrics and poems from a short prompt.\n\nRuns an interactive TUI by default. Set OPENAI_API_KEY before starting.")]
struct Cli {
    /// Prompt for pipe mode
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// No TUI, just print the generated text (for scripting)
    #[arg(long)]
    pipe: bool,

    /// Framing to apply: song or poem
    #[arg(long, value_name = "MODE")]
    mode: Option<Mode>,

    /// Maximum number of tokens to generate (1-500)
    #[arg(short = 't', long, value_name = "N")]
    max_tokens: Option<u32>,

    /// Also save the generated text to this file (pipe mode)
    #[arg(short = 'o', long, value_name = "PATH", requires = "pipe")]
    output: Option<PathBuf>,

    /// Override model from config
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open configuration file in $EDITOR
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config) => handle_config(),
        None if cli.pipe => {
            init_logging(LogTarget::Stderr)?;
            handle_pipe(cli).await
        }
        None => {
            init_logging(LogTarget::File)?;
            handle_tui(cli).await
        }
    }
}

enum LogTarget {
    Stderr,
    /// The TUI owns the terminal, so logs go to the cache directory.
    File,
}

/// Initialize tracing with `RUST_LOG` overriding the defaults.
fn init_logging(target: LogTarget) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("lyricgen=info".parse()?)
        .add_directive("reqwest=warn".parse()?);

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File => {
            let path = config::Config::log_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
    }
    Ok(())
}

/// Build the completion client from config, reading the credential once.
fn build_client(config: &config::Config, model_override: Option<String>) -> Result<CompletionClient> {
    let mut client_config = config.client_config();
    if let Some(model) = model_override {
        client_config.model = model;
    }
    info!("Using model {} at {}", client_config.model, client_config.url);
    CompletionClient::new(client_config)
}

/// Run the interactive shell.
async fn handle_tui(cli: Cli) -> Result<()> {
    let mut config = config::Config::load().context("Failed to load configuration")?;
    if let Some(mode) = cli.mode {
        config.defaults.mode = mode;
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.defaults.max_tokens = max_tokens;
    }

    let client = build_client(&config, cli.model)?;
    let mut shell = shell::Shell::new(client, &config.defaults);
    shell::run_tui(&mut shell).await?;

    info!("Session ended after {} generations", shell.history().len());
    Ok(())
}

/// Run a single generation without the TUI.
async fn handle_pipe(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("Failed to load configuration")?;
    let prompt = cli
        .prompt
        .ok_or_else(|| anyhow::anyhow!("Prompt required in --pipe mode"))?;
    let mode = cli.mode.unwrap_or(config.defaults.mode);
    let max_tokens = cli.max_tokens.unwrap_or(config.defaults.max_tokens);

    let request = GenerationRequest::new(prompt, mode, max_tokens)?;
    let client = build_client(&config, cli.model)?;

    match client.generate(&request).await {
        Ok(text) => {
            if let Some(path) = &cli.output {
                shell::write_text(path, &text)?;
                info!("Saved lyrics to {}", path.display());
            }
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = config::Config::config_path()?;

    // Create default config if it doesn't exist
    if !config_path.exists() {
        let default_config = config::Config::default();
        default_config.save()?;
        println!("Created default config at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}
