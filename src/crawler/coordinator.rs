//! Crawl coordinator
//!
//! Drives the crawl in discrete waves. The seeds form wave 0; every later wave
//! is built from the links the previous one yielded, filtered and sampled by
//! the frontier rules, and is fully awaited before the next one starts. Within
//! a wave at most `concurrency` page visits run at the same time.

use crate::config::CrawlerConfig;
use crate::crawler::extractor::FactExtractor;
use crate::crawler::fetcher::{PageFetcher, PageHandle};
use crate::crawler::frontier::{filter_links, sample, WorkItem, SEED_ROOT};
use crate::ingest::{IngestOutcome, IngestPipeline, PageFacts};
use crate::storage::{Database, VisitedRegistry};
use crate::url::strip_trailing_slash;
use crate::CensusError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Summary of a finished crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Frontier-advance waves run after the seed wave
    pub waves: u32,
    /// Pages loaded and extracted, whether or not their facts were stored
    pub visited: usize,
    /// Visited pages whose facts were ingested
    pub stored: usize,
    /// Visits that failed to load or extract
    pub failed: usize,
    /// Links not dispatched because they were already visited
    pub skipped: usize,
}

/// Coordinates waves of page visits
pub struct Coordinator<F, E> {
    registry: VisitedRegistry,
    pipeline: IngestPipeline,
    fetcher: Arc<F>,
    extractor: Arc<E>,
    config: CrawlerConfig,
}

impl<F, E> Coordinator<F, E>
where
    F: PageFetcher + 'static,
    E: FactExtractor + 'static,
{
    /// Creates a coordinator writing into `db`
    ///
    /// # Arguments
    ///
    /// * `db` - The census database
    /// * `fetcher` - Loads pages and lists their links
    /// * `extractor` - Turns loaded pages into facts
    /// * `config` - Depth, breadth, follow flags and concurrency
    pub fn new(db: Database, fetcher: F, extractor: E, config: CrawlerConfig) -> Self {
        Self {
            registry: VisitedRegistry::new(db.clone()),
            pipeline: IngestPipeline::new(db),
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            config,
        }
    }

    /// Crawls from `seeds` until the depth is spent or nothing is left to visit
    ///
    /// Individual visit failures are logged and counted; they never abort the
    /// crawl.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl ran to completion
    /// * `Err(CensusError)` - Reserved for failures outside any single visit
    pub async fn run(&self, seeds: &[String]) -> Result<CrawlReport, CensusError> {
        let mut report = CrawlReport::default();
        let mut dispatched: HashSet<String> = HashSet::new();

        tracing::info!("Starting crawl from {} seed(s)", seeds.len());

        let seed_wave: Vec<WorkItem> = seeds
            .iter()
            .map(|seed| WorkItem::new(SEED_ROOT, vec![seed.clone()]))
            .collect();
        let mut frontier = self.dispatch(seed_wave, &mut dispatched, &mut report).await;

        let mut remaining = self.config.depth.limit();
        loop {
            if remaining == Some(0) {
                tracing::info!("Depth exhausted, crawl complete");
                break;
            }
            if frontier.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            }

            let filtered: Vec<WorkItem> = frontier
                .into_iter()
                .map(|item| {
                    filter_links(
                        item,
                        self.config.follow_internal,
                        self.config.follow_external,
                    )
                })
                .filter(|item| !item.links.is_empty())
                .collect();
            let wave = sample(filtered, self.config.breadth, &mut rand::rng());

            report.waves += 1;
            tracing::info!(
                "Wave {}: {} link(s) from {} page(s)",
                report.waves,
                wave.iter().map(|item| item.links.len()).sum::<usize>(),
                wave.len()
            );

            frontier = self.dispatch(wave, &mut dispatched, &mut report).await;
            remaining = remaining.map(|depth| depth - 1);
        }

        tracing::info!(
            "Crawl finished: {} wave(s), {} visited ({} stored), {} failed, {} skipped",
            report.waves,
            report.visited,
            report.stored,
            report.failed,
            report.skipped
        );

        Ok(report)
    }

    /// Visits every not-yet-visited link of `items` and waits for all visits
    async fn dispatch(
        &self,
        items: Vec<WorkItem>,
        dispatched: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) -> Vec<WorkItem> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));
        let mut visits = JoinSet::new();

        for item in items {
            for link in item.links {
                if !dispatched.insert(strip_trailing_slash(&link).to_string()) {
                    tracing::debug!("Already dispatched {}", link);
                    continue;
                }

                match self.registry.is_visited(&link).await {
                    Ok(false) => {}
                    Ok(true) => {
                        tracing::debug!("Skipping visited {}", link);
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping {}: visited check failed: {}", link, e);
                        report.skipped += 1;
                        continue;
                    }
                }

                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };

                let fetcher = self.fetcher.clone();
                let extractor = self.extractor.clone();
                let pipeline = self.pipeline.clone();
                let root = item.root.clone();

                visits.spawn(async move {
                    let result = visit(&*fetcher, &*extractor, &pipeline, &root, &link).await;
                    drop(permit);
                    (link, result)
                });
            }
        }

        let mut next = Vec::new();
        while let Some(joined) = visits.join_next().await {
            match joined {
                Ok((_, Ok(visited))) => {
                    report.visited += 1;
                    if visited.stored {
                        report.stored += 1;
                    }
                    next.push(visited.item);
                }
                Ok((link, Err(e))) => {
                    tracing::warn!("Visit to {} failed: {}", link, e);
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Visit task aborted: {}", e);
                    report.failed += 1;
                }
            }
        }

        next
    }
}

/// A completed page visit
struct Visited {
    /// The links the page yielded, rooted at the page
    item: WorkItem,
    /// Whether the page's facts were ingested
    stored: bool,
}

/// Loads, extracts and ingests one page, returning the links it yielded
///
/// The page handle is released on every path once it has been loaded.
async fn visit<F, E>(
    fetcher: &F,
    extractor: &E,
    pipeline: &IngestPipeline,
    root: &str,
    url: &str,
) -> Result<Visited, CensusError>
where
    F: PageFetcher + ?Sized,
    E: FactExtractor + ?Sized,
{
    tracing::info!("Visiting {} (root {})", url, root);

    let page = fetcher.load(url).await?;
    let result = process(fetcher, extractor, pipeline, root, &page).await;
    fetcher.release(page).await;

    result
}

async fn process<F, E>(
    fetcher: &F,
    extractor: &E,
    pipeline: &IngestPipeline,
    root: &str,
    page: &PageHandle,
) -> Result<Visited, CensusError>
where
    F: PageFetcher + ?Sized,
    E: FactExtractor + ?Sized,
{
    let extracted = extractor.extract(page).await?;
    let hyperlinks = fetcher.outgoing_links(page);

    let name = Url::parse(&page.url)?
        .host_str()
        .unwrap_or_default()
        .to_string();

    let mut links: Vec<String> = Vec::with_capacity(hyperlinks.len());
    for hyperlink in &hyperlinks {
        if !links.contains(&hyperlink.url) {
            links.push(hyperlink.url.clone());
        }
    }

    let facts = PageFacts::new(name, page.url.clone(), root)
        .with_extracted(extracted)
        .with_hyperlinks(hyperlinks);

    let stored = match pipeline.ingest(facts).await {
        IngestOutcome::Ingested { site_id } => {
            tracing::debug!("Stored {} as site {}", page.url, site_id);
            true
        }
        IngestOutcome::Rejected(reason) => {
            tracing::warn!("Facts for {} not stored: {}", page.url, reason);
            false
        }
        // Already logged by the pipeline; the links are still followed
        IngestOutcome::Failed(_) => false,
    };

    Ok(Visited {
        item: WorkItem::new(page.url.clone(), links),
        stored,
    })
}
