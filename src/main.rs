//! Webstack-Census main entry point
//!
//! This is the command-line interface for the Webstack-Census crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use webstack_census::config::{load_config_with_hash, load_seeds, Config};
use webstack_census::crawler::crawl;
use webstack_census::storage::open_database;

/// Webstack-Census: a technology census crawler
///
/// Webstack-Census crawls websites to a bounded depth and breadth, records the
/// languages, libraries, frameworks, ad tracking and embedded modules each page
/// uses, and stores them in a deduplicated SQLite database.
#[derive(Parser, Debug)]
#[command(name = "webstack-census")]
#[command(version)]
#[command(about = "A technology census crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show row counts from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config).await
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webstack_census=info,warn"),
            1 => EnvFilter::new("webstack_census=debug,info"),
            2 => EnvFilter::new("webstack_census=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let seeds = load_seeds(&config.input).context("Failed to load seeds")?;

    println!("=== Webstack-Census Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Depth: {}", config.crawler.depth);
    println!("  Breadth: {}", config.crawler.breadth);
    println!("  Follow internal: {}", config.crawler.follow_internal);
    println!("  Follow external: {}", config.crawler.follow_external);
    println!("  Concurrency: {}", config.crawler.concurrency);

    println!("\nFetcher:");
    println!("  Name: {}", config.fetcher.crawler_name);
    println!("  Version: {}", config.fetcher.crawler_version);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Lock timeout: {}ms", config.output.lock_timeout_ms);

    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", seeds.len());

    Ok(())
}

/// Handles the --stats mode: shows per-table row counts
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let db = open_database(
        Path::new(&config.output.database_path),
        config.output.lock_timeout_ms,
    )
    .context("Failed to open database")?;

    let session = db.session().await?;
    let counts = session.table_counts()?;

    println!("Database: {}\n", config.output.database_path);
    for (table, count) in counts {
        println!("  {:<26} {:>8}", table, count);
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let seeds = load_seeds(&config.input).context("Failed to load seeds")?;
    tracing::info!("Total seed URLs: {}", seeds.len());

    let db = open_database(
        Path::new(&config.output.database_path),
        config.output.lock_timeout_ms,
    )
    .context("Failed to open database")?;

    match crawl(config, &seeds, db).await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed: {} visited ({} stored), {} failed, {} skipped over {} wave(s)",
                report.visited,
                report.stored,
                report.failed,
                report.skipped,
                report.waves
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
