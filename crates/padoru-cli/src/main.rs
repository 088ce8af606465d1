//! Padoru CLI - browse a Padoru collection from the terminal.
//!
//! Usage:
//!   padoru list                 all entries
//!   padoru female | male        entries filtered by the female flag
//!   padoru random [OUT]         pick a random entry, optionally saving its image
//!
//! The collection source comes from `PADORU_COLLECTION`, the config file,
//! or the public collection, in that order.

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use padoru_core::{Config, EntrySet, ImageSource, PadoruClient};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the configured collection source
const SOURCE_ENV: &str = "PADORU_COLLECTION";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_entries(entries: &EntrySet) {
    for entry in entries {
        println!("{}", entry);
    }
    println!("{} entries", entries.len());
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("random");

    let config = Config::load().context("Failed to load config")?;
    let source = std::env::var(SOURCE_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| config.collection_source_or_default().to_string());

    let client = PadoruClient::from_config(&config).context("Failed to create client")?;
    info!(source = %source, "Loading collection");
    client
        .load_collection_str(&source)
        .await
        .with_context(|| format!("Failed to load collection from {}", source))?;

    match command {
        "list" => print_entries(&client.get_entries().await?),
        "female" => print_entries(&client.get_entries_where(|e| e.is_female).await?),
        "male" => print_entries(&client.get_entries_where(|e| !e.is_female).await?),
        "random" => {
            let entry = client.get_random_entry().await?;
            println!("{}", entry);
            if let Some(creator) = entry.image_creator.as_deref() {
                println!("  by {}", creator);
            }

            if let Some(out) = args.get(1).map(PathBuf::from) {
                let Some(image) = client.image_data(&entry).await else {
                    bail!("No image available for {}", entry.name);
                };
                std::fs::write(&out, &image.bytes)
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                let from = match image.source {
                    ImageSource::Local => "local file",
                    ImageSource::Remote => "download",
                };
                println!("  saved {} bytes from {} to {}", image.bytes.len(), from, out.display());
            }
        }
        other => bail!("Unknown command '{}'; expected list, female, male or random", other),
    }

    Ok(())
}
