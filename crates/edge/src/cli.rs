// crates/edge/src/cli.rs

use crate::db::Store;
use crate::index::{self, Indexer};
use crate::{query, web, Result};
use chrono::Utc;
use clap::{builder::ValueHint, Parser, Subcommand};
use domain::setting::{default_config_path, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Glean CLI
#[tokio::main(flavor = "multi_thread")]
#[tracing::instrument(skip_all)]
pub async fn start() -> ExitCode {
    let cli = Cli::parse();

    run(cli).await.map_or_else(
        |e| {
            error!("{e}");
            ExitCode::FAILURE
        },
        |_| ExitCode::SUCCESS,
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "glean",
    version,
    about = "A personal search engine over your files and feeds"
)]
pub struct Cli {
    /// Settings file (defaults to ~/.config/glean/config.toml)
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "GLEAN_CONFIG",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the configured directories and feeds
    Index(IndexCmd),
    /// Search for documents and posts
    Search(SearchCmd),
    /// Show the settings file in effect
    Config,
    /// Drop all indexed data and recreate the schema
    Purge,
    /// Reclaim unused space in the database
    Vacuum,
    /// Expose the search endpoint over HTTP
    Serve(ServeCmd),
}

#[derive(Parser, Debug)]
pub struct IndexCmd {
    /// Maximum number of concurrent workers (default: half of CPU cores)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_workers: Option<u32>,
}

#[derive(Parser, Debug)]
pub struct SearchCmd {
    /// Search terms to find relevant documents
    #[arg(short, long)]
    pub query: String,

    /// Limit the number of documents returned
    #[arg(short, long, default_value_t = 10)]
    pub limit: i64,
}

#[derive(Parser, Debug)]
pub struct ServeCmd {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,
}

#[tracing::instrument(skip_all)]
async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let settings = Settings::load(&config_path)?;

    if let Commands::Config = cli.command {
        println!("settings file: {}", config_path.display());
        println!("{settings:#?}");
        return Ok(());
    }

    let then = Utc::now();
    let store = Store::open(&settings.sqlite_url).await?;
    info!(
        "Store opened in {} milliseconds",
        Utc::now().timestamp_millis() - then.timestamp_millis()
    );

    match cli.command {
        Commands::Index(cmd) => do_index(store, settings, cmd).await,
        Commands::Search(cmd) => do_search(store, cmd).await,
        Commands::Config => Ok(()), // handled before the store opens
        Commands::Purge => {
            store.purge().await?;
            info!("database purged");
            println!("[Ok] database purged correctly!");
            Ok(())
        }
        Commands::Vacuum => {
            store.vacuum().await?;
            info!("unused space reclaimed");
            println!("[Ok] unused space has been reclaimed!");
            Ok(())
        }
        Commands::Serve(cmd) => web::serve(store, cmd.port).await,
    }
}

#[tracing::instrument(skip_all)]
async fn do_index(store: Store, settings: Settings, cmd: IndexCmd) -> Result<()> {
    let max_workers = cmd
        .max_workers
        .map(|n| n as usize)
        .unwrap_or_else(index::default_max_workers);

    // Ctrl-C requests a cooperative stop; in-flight transactions finish.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested, finishing in-flight work");
                cancel.cancel();
            }
        });
    }

    let then = Utc::now();
    let report = Indexer::new(store)
        .index_all(&settings, max_workers, &cancel)
        .await?;
    info!(
        "Indexing finished in {} milliseconds",
        Utc::now().timestamp_millis() - then.timestamp_millis()
    );

    println!("Done: {report}.");
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn do_search(store: Store, cmd: SearchCmd) -> Result<()> {
    let started = Instant::now();
    let hits = query::search(&store, &cmd.query, cmd.limit).await?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    let elapsed = started.elapsed();
    for hit in &hits {
        let snippet: String = hit.snippet.replace('\n', " ");
        println!("{}  {}\n    {}\n    {}", hit.kind, hit.title, hit.uri, snippet);
    }
    println!("Found {} results in {:.3}s", hits.len(), elapsed.as_secs_f64());

    Ok(())
}
