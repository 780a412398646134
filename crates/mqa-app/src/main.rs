//! MQA chat binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the file-backed history store in the data directory
//! 3. Build the conversation engine and the prediction endpoint client
//! 4. Run the widget with a terminal view, reading visitor input from stdin

mod cli;
mod terminal;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use mqa_chat::{
    AnswerCatalog, Command, ConversationEngine, FileStore, HistoryStore, RemoteAnswerClient,
    Widget,
};
use mqa_core::config::ChatConfig;
use mqa_core::error::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::CliArgs;
use crate::terminal::{Input, Menu, TerminalView, HELP};

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Config is read before tracing so the configured level can seed the filter.
    let config_file = args.resolve_config_path();
    let (mut config, config_error) = match ChatConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (ChatConfig::default(), Some(e)),
    };

    // Tracing goes to stderr; stdout carries the conversation.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting MQA chat v{}", env!("CARGO_PKG_VERSION"));
    match config_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Storage.
    let data_dir = resolve_data_dir(&args.resolve_data_dir(&config.storage.data_dir));
    let store = FileStore::open(&data_dir).inspect_err(|e| {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to open data directory");
    })?;
    let history = HistoryStore::new(Arc::new(store), config.widget.storage_key.clone());
    tracing::info!(path = %data_dir.display(), key = %history.key(), "History store opened");

    // Conversation.
    let engine = ConversationEngine::new(Arc::new(AnswerCatalog::builtin()), history, &config.widget)?;
    config.remote.endpoint = args.resolve_endpoint(&config.remote.endpoint);
    let client = RemoteAnswerClient::new(&config.remote)?;
    tracing::info!(endpoint = %client.endpoint(), "Prediction endpoint configured");

    let widget = Widget::new(engine, Arc::new(client));
    let handle = widget.handle();
    let menu = Arc::new(Mutex::new(Menu::default()));
    let view = TerminalView::new(
        std::io::stdout(),
        Arc::clone(&menu),
        config.widget.bot_name.clone(),
        data_dir.clone(),
    );
    let runner = tokio::spawn(widget.run(view));

    println!("{HELP}");
    handle.send(Command::Toggle).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = {
            let mut menu = menu.lock().unwrap_or_else(PoisonError::into_inner);
            terminal::parse_input(&line, &mut menu)
        };
        match input {
            Input::Command(command) => {
                if !handle.send(command).await {
                    break;
                }
            }
            Input::Help => println!("{HELP}"),
            Input::Unknown(reason) => println!("{reason}. Type /help for commands."),
            Input::Quit => break,
            Input::Nothing => {}
        }
    }

    // Pending answers still land in the history before exit.
    drop(handle);
    if let Err(e) = runner.await {
        tracing::error!(error = %e, "Widget task failed");
    }
    tracing::info!("MQA chat stopped");
    Ok(())
}
