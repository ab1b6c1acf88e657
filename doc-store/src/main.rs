//! `folio-doc-store` command-line entry point.
//!
//! Reads or updates the document the folio web API serves, going through the
//! same serialized update path the API uses.
//!
//! ## Commands
//!
//! - `folio-doc-store show`
//! - `folio-doc-store endorse [--by N]`
//! - `folio-doc-store visit [--by N]`
//! - `folio-doc-store contact [--at RFC3339]`

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use folio_doc_store::{Store, StoreConfig, ops};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "folio-doc-store", version, about = "Inspect and update the folio document store")]
struct Cli {
    /// Config file (defaults to $FOLIO_STORE_CONFIG, then ~/.config/folio/store.toml).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Override the document path from the config.
    #[arg(long = "data", global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current document as JSON.
    Show,
    /// Add endorsements and print the new total.
    Endorse(CountArgs),
    /// Add visitors and print the new total.
    Visit(CountArgs),
    /// Record a contact timestamp.
    Contact(ContactArgs),
}

#[derive(Debug, Parser)]
struct CountArgs {
    /// Amount to add.
    #[arg(long = "by", default_value_t = 1)]
    by: u64,
}

#[derive(Debug, Parser)]
struct ContactArgs {
    /// RFC 3339 timestamp (defaults to now).
    #[arg(long = "at")]
    at: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::load_from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::load().context("loading config")?,
    };
    if let Some(data) = &cli.data {
        config.data_path = data.to_string_lossy().into_owned();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = Store::from_config(&config);
    tracing::debug!(path = %config.resolved_data_path().display(), "using document");

    let result = run(&store, cli.command).await;
    store.shutdown().await;
    result
}

async fn run(store: &Store, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Show => {
            let doc = store.get().await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::Endorse(args) => {
            println!("{}", ops::increment_endorsements(store, args.by).await?);
        }
        Command::Visit(args) => {
            println!("{}", ops::increment_visitors(store, args.by).await?);
        }
        Command::Contact(args) => {
            let at = match args.at {
                Some(text) => DateTime::parse_from_rfc3339(&text)
                    .with_context(|| format!("invalid timestamp {text:?}"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            println!("{}", ops::record_contact(store, at).await?);
        }
    }
    Ok(())
}
