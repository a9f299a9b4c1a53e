//! rollcall-ingest - roll-call ballot ingestion tool
//!
//! Loads ballot-event payload files into the rollcall database, recomputes
//! event totals and prints stored events.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rollcall_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use rollcall_common::db::init_database;
use rollcall_ingest::{recompute_totals, run_batch, BatchOptions, Recompute, SqliteStore};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rollcall-ingest")]
#[command(about = "Ingest roll-call ballot records and derive event totals")]
#[command(version)]
struct Args {
    /// Folder holding rollcall.db
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to the platform config location)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest ballot-event payload files (one event per file)
    Ingest {
        /// Events processed concurrently
        #[arg(long)]
        concurrency: Option<usize>,

        /// Skip files whose payload is already stored unchanged
        #[arg(long)]
        skip_unchanged: bool,

        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Recompute totals of already ingested events
    Recompute {
        #[arg(required = true, value_name = "EVENT_ID")]
        event_ids: Vec<String>,
    },

    /// Print a stored event as JSON
    Show {
        event_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TomlConfig::load_from(path)?,
        None => TomlConfig::load()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting rollcall-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("rollcall-ingest")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(config.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let store = SqliteStore::from_config(pool, &config.ingest);

    match args.command {
        Command::Ingest {
            concurrency,
            skip_unchanged,
            files,
        } => {
            let mut options = BatchOptions::from(&config.ingest);
            if let Some(concurrency) = concurrency {
                options.concurrency = concurrency;
            }
            options.skip_unchanged |= skip_unchanged;

            let report = run_batch(&store, files, &options).await;
            for event in &report.events {
                println!("{}", event.display_string());
            }
            println!("{}", report.display_string());

            if report.all_failed() {
                bail!("All {} events failed", report.events.len());
            }
        }

        Command::Recompute { event_ids } => {
            let mut failed = 0;
            for event_id in &event_ids {
                match recompute_totals(&store, &store, event_id).await {
                    Ok(Recompute::Updated(result)) => println!(
                        "{}: {}, outcome {}",
                        event_id,
                        result.totals,
                        result.outcome.as_deref().unwrap_or("undetermined")
                    ),
                    Ok(Recompute::Skipped) => println!("{}: skipped (no individual votes)", event_id),
                    Err(e) => {
                        error!(event_id = %event_id, "Recompute failed: {}", e);
                        println!("{}: FAILED ({})", event_id, e);
                        failed += 1;
                    }
                }
            }

            if failed == event_ids.len() {
                bail!("All {} recomputations failed", failed);
            }
        }

        Command::Show { event_id } => {
            let Some(mut event) = store.load_event(&event_id).await? else {
                warn!(event_id = %event_id, "Event not found");
                bail!("Unknown ballot event: {}", event_id);
            };

            // Payload can be large; the digest identifies it
            event.raw_payload = None;
            let dissent = store.dissenting_votes(&event_id).await?;

            let output = serde_json::json!({
                "event": event,
                "individual_votes": store.count_votes(&event_id).await?,
                "dissenting_votes": dissent,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
