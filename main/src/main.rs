#![warn(
    clippy::string_slice,
    clippy::str_to_string,
    clippy::inefficient_to_string,
    clippy::manual_string_new,
    clippy::map_unwrap_or,
    clippy::needless_pass_by_value,
    clippy::unused_self,
    clippy::explicit_iter_loop
)]

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use database_api::RestDatabase;
use generation_store::{
    config::{StoreConfig, StoreSettings},
    GenerationStore, NewGenerationInput, RecordId, DEFAULT_LIST_LIMIT,
};
use serde::Serialize;
use tokio::fs;
use tracing as log;
use tracing_subscriber::EnvFilter;

/// Manage saved card generations.
#[derive(Parser, Debug)]
#[command(name = "cardgen", version)]
struct Cli {
    /// JSON config file with `url`, `key` and `table`; environment variables take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Check that the database answers
    Health,
    /// List saved generations, most recent first
    List {
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: NonZeroUsize,
    },
    /// Print one generation
    Get { id: RecordId },
    /// Delete one generation
    Delete { id: RecordId },
    /// Save a generation read from a JSON file
    Save { input: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()).await {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Invalid database configuration: {:#}", e);
            return Err(e);
        }
    };

    log::info!("Database url: {}", settings.url);
    log::info!("Database key: {}", if settings.key.is_empty() { "missing" } else { "loaded" });

    let db = RestDatabase::new(settings.client_params()).context("Failed to create database client")?;
    let store = GenerationStore::with_table(Arc::new(db), settings.table);

    run(&store, cli.command).await
}

async fn load_settings(path: Option<&Path>) -> anyhow::Result<StoreSettings> {
    let config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            StoreConfig::from_json(&raw)?
        }
        None => StoreConfig::default(),
    };

    // Development defaults are only acceptable in debug builds
    let settings = config
        .with_env(|name| std::env::var(name).ok())
        .resolve(cfg!(debug_assertions))?;
    Ok(settings)
}

async fn run(store: &GenerationStore, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Health => {
            if store.health_check().await {
                println!("ok");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("unreachable");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::List { limit } => print_json(&store.list(limit).await?),
        Command::Get { id } => print_json(&store.get_by_id(&id).await?),
        Command::Delete { id } => {
            store.delete_by_id(&id).await?;
            println!("deleted {id}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Save { input } => {
            let raw = fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let input: NewGenerationInput = serde_json::from_str(&raw).context("Failed to parse generation input")?;
            if !input.is_aligned() {
                log::warn!(
                    "Saving {} titles with {} descriptions",
                    input.titles.len(),
                    input.descriptions.len()
                );
            }
            print_json(&store.create(&input).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}
