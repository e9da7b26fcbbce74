//! Crawler module for page fetching and fact collection
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`PageFetcher`] trait
//! - HTML fact and link extraction behind the [`FactExtractor`] trait
//! - Frontier filtering and breadth sampling
//! - Wave-by-wave crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;

pub use coordinator::{Coordinator, CrawlReport};
pub use extractor::{extract_hyperlinks, ExtractError, FactExtractor, HtmlExtractor};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher, PageHandle};
pub use frontier::{filter_links, sample, WorkItem, SEED_ROOT};

use crate::config::Config;
use crate::storage::Database;
use crate::CensusError;

/// Runs a complete crawl with the HTTP fetcher and HTML extractor
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client
/// 2. Visit the seeds, then follow links wave by wave
/// 3. Ingest every visited page into `db`
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `seeds` - Seed URLs, already validated
/// * `db` - The census database
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(CensusError)` - The crawl could not start
pub async fn crawl(
    config: &Config,
    seeds: &[String],
    db: Database,
) -> Result<CrawlReport, CensusError> {
    let fetcher = HttpFetcher::new(&config.fetcher)?;
    let coordinator = Coordinator::new(db, fetcher, HtmlExtractor, config.crawler.clone());
    coordinator.run(seeds).await
}
