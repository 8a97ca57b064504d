//! Lode-Finder main entry point
//!
//! This is the command-line interface for the Lode-Finder extraction pipeline.

use clap::Parser;
use lode_finder::config::{load_config_with_hash, Config};
use lode_finder::providers::Providers;
use lode_finder::report::{
    load_run_statistics, print_entity_detail, print_entity_list, print_run_statistics,
};
use lode_finder::storage::{open_storage, Storage};
use lode_finder::Coordinator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lode-Finder: company intelligence for the mining sector
///
/// Lode-Finder searches the web for each company's leadership and operations
/// pages, crawls them, extracts leaders and assets with a language model,
/// and stores the results in SQLite.
#[derive(Parser, Debug)]
#[command(name = "lode-finder")]
#[command(version)]
#[command(about = "Company intelligence extraction pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Comma-separated company names to process, e.g. "BHP, Rio Tinto"
    #[arg(long, value_name = "NAMES", conflicts_with_all = ["debug", "show_run", "list", "dry_run"])]
    ingest: Option<String>,

    /// Run the pipeline for one company without storing anything
    #[arg(long, value_name = "NAME", conflicts_with_all = ["show_run", "list", "dry_run"])]
    debug: Option<String>,

    /// Show the status of a previous run and exit
    #[arg(long, value_name = "RUN_ID", conflicts_with_all = ["list", "dry_run"])]
    show_run: Option<i64>,

    /// List stored entities, or show one with --entity
    #[arg(long, conflicts_with = "dry_run")]
    list: bool,

    /// Entity id to show in full with --list
    #[arg(long, value_name = "ENTITY_ID", requires = "list")]
    entity: Option<i64>,

    /// Validate config and show the resolved settings without running anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // API keys may live in a local .env file
    let _ = dotenvy::dotenv();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if let Some(run_id) = cli.show_run {
        handle_show_run(&config, run_id)?;
    } else if cli.list {
        handle_list(&config, cli.entity)?;
    } else if let Some(company) = cli.debug {
        handle_debug(&config, &company).await?;
    } else if let Some(input) = cli.ingest {
        handle_ingest(&config, &input).await?;
    } else {
        return Err("nothing to do: pass --ingest, --debug, --show-run, --list or --dry-run".into());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lode_finder=info,warn"),
            1 => EnvFilter::new("lode_finder=debug,info"),
            2 => EnvFilter::new("lode_finder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the resolved settings
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = &config.pipeline;

    println!("=== Lode-Finder Dry Run ===\n");

    println!("Pipeline Configuration:");
    println!("  Concurrent companies: {}", pipeline.concurrent_companies);
    println!(
        "  LLM requests per minute: {}",
        pipeline.llm_requests_per_minute
    );
    println!(
        "  Retry on 429: {} (max {} retries)",
        pipeline.retry_on_429, pipeline.max_retries
    );
    println!("  Request timeout: {}ms", pipeline.request_timeout_ms);
    println!(
        "  Search results per query: {}",
        pipeline.search_results_per_query
    );
    println!(
        "  URLs crawled per topic: {}",
        pipeline.max_urls_to_crawl_per_topic
    );
    println!(
        "  Content length: {} min, {} per URL, {} total",
        pipeline.min_content_length,
        pipeline.max_content_length_per_url,
        pipeline.max_content_length
    );

    println!("\nProviders:");
    println!("  Search: {}", config.providers.search);
    println!("  Crawl: {}", config.providers.crawl);
    println!("  LLM: {}", config.providers.llm);
    if let Some(model) = &config.providers.model {
        println!("  Model: {}", model);
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    // Building the providers checks that every required API key is present
    Providers::from_config(config)?;

    println!("\n✓ Configuration is valid");
    println!("✓ All required API keys are available");

    Ok(())
}

/// Handles the --show-run mode: prints a run's progress from the database
fn handle_show_run(config: &Config, run_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_run_statistics(&storage, run_id)?;
    print_run_statistics(&stats);

    Ok(())
}

/// Handles the --list mode: prints stored entities
fn handle_list(config: &Config, entity_id: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(Path::new(&config.output.database_path))?;

    match entity_id {
        Some(id) => print_entity_detail(&storage.get_entity(id)?),
        None => print_entity_list(&storage.list_entities()?),
    }

    Ok(())
}

/// Handles the --debug mode: runs one company and prints the trace as JSON
async fn handle_debug(config: &Config, company: &str) -> Result<(), Box<dyn std::error::Error>> {
    let providers = Providers::from_config(config)?;

    // Debug runs never write, but the coordinator still needs a backend
    let storage: Arc<dyn Storage> = Arc::new(lode_finder::storage::SqliteStorage::open_in_memory()?);
    let coordinator = Coordinator::new(providers, storage, &config.pipeline);

    let report = coordinator.debug_entity(company).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Handles the --ingest mode: runs the pipeline to completion
async fn handle_ingest(config: &Config, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let providers = Providers::from_config(config)?;
    let storage: Arc<dyn Storage> =
        Arc::new(open_storage(Path::new(&config.output.database_path))?);

    let coordinator = Arc::new(Coordinator::new(
        providers,
        Arc::clone(&storage),
        &config.pipeline,
    ));

    let (run_id, names) = coordinator.submit(input)?;
    println!("Started run {} for {} company(ies)\n", run_id, names.len());

    if let Err(e) = Arc::clone(&coordinator).spawn_run(run_id, names).await {
        tracing::error!("Run supervisor failed: {}", e);
    }

    let stats = load_run_statistics(storage.as_ref(), run_id)?;
    print_run_statistics(&stats);

    Ok(())
}
