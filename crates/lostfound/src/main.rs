//! `lostfound-bot` - CLI for lostfound
//!
//! This binary runs the Telegram bot and offers a few commands for inspecting
//! its configuration and stored data.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use lostfound::cli::{Cli, Command, ConfigCommand, RunCommand};
use lostfound::config::StorageBackend;
use lostfound::poller::{stop_on_ctrl_c, Poller};
use lostfound::storage::{open_store, SqliteDocumentStore};
use lostfound::transport::TelegramTransport;
use lostfound::{init_logging, Bot, Config, Registry};
use lostfound_telegram::Client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // `config validate` reports problems instead of failing to start
    if let Command::Config(ConfigCommand::Validate { file }) = cli.command {
        handle_validate(file.or(cli.config));
        return Ok(());
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Run(run_cmd) => handle_run(&config, &run_cmd).await,
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_run(config: &Config, cmd: &RunCommand) -> anyhow::Result<()> {
    let token = config.require_token()?;
    let client = Client::with_api_url(token, config.telegram.api_url.as_str());

    let backend = if cmd.ephemeral {
        StorageBackend::Memory
    } else {
        config.storage.backend
    };
    let store = open_store(backend, &config.database_path())?;
    let registry = Registry::new(store);

    let settings = config.bot_settings()?;
    info!(
        "Starting {} bot, posting to {} ({} backend)",
        lostfound_telegram::platform_name(),
        settings.channel,
        backend
    );

    let transport = Arc::new(TelegramTransport::new(client.clone()));
    let bot = Bot::new(registry, transport, settings);
    let poller = Poller::new(client, bot, config.poller_config());
    stop_on_ctrl_c(poller.handle());
    poller.run().await;
    Ok(())
}

async fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let (stats, size_bytes) = match config.storage.backend {
        StorageBackend::Sqlite => {
            let store = Arc::new(SqliteDocumentStore::open(config.database_path())?);
            let size = store.size_bytes();
            (Registry::new(store).stats().await?, Some(size))
        }
        StorageBackend::Memory => {
            let store = open_store(StorageBackend::Memory, &config.database_path())?;
            (Registry::new(store).stats().await?, None)
        }
    };

    if json {
        let status = serde_json::json!({
            "backend": config.storage.backend,
            "database_path": config.database_path(),
            "database_size_bytes": size_bytes,
            "profiles": stats.profiles,
            "reports": stats.reports,
            "channel": config.telegram.channel,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("lostfound-bot status");
        println!("--------------------");
        println!("Backend:       {}", config.storage.backend);
        if let Some(size) = size_bytes {
            println!("Database:      {}", config.database_path().display());
            println!("Size:          {size} bytes");
        }
        println!("Channel:       {}", config.telegram.channel);
        println!("Profiles:      {}", stats.profiles);
        println!("Reports:       {}", stats.reports);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = config.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Telegram]");
                println!("  Bot token:          {}", config.telegram.bot_token);
                println!("  Channel:            {}", config.telegram.channel);
                println!("  API URL:            {}", config.telegram.api_url);
                println!("  Poll timeout (s):   {}", config.telegram.poll_timeout_secs);
                println!("  Retry delay (ms):   {}", config.telegram.retry_delay_ms);
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Conversation]");
                println!(
                    "  Browse button:      {}",
                    config.conversation.show_browse_button
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file),
    }
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(config) => match config.require_token() {
            Ok(_) => println!("Configuration is valid."),
            Err(e) => println!("Configuration is valid but cannot run the bot: {e}"),
        },
        Err(e) => println!("Configuration error: {e}"),
    }
}
