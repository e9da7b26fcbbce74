//! Crawl frontier
//!
//! The frontier is the set of work items for the next wave. Each item is a
//! page that was just visited together with the links it yielded. Before a
//! wave is dispatched the frontier goes through two steps:
//! - Link filtering by registrable domain against the originating page
//! - Breadth sampling, per item and across items

use crate::config::Bound;
use crate::url::classify_link;
use rand::seq::SliceRandom;
use rand::Rng;

/// Root recorded for pages reached directly from the seed list
pub const SEED_ROOT: &str = "seed";

/// Links found on one page, waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Url of the page the links were found on, or [`SEED_ROOT`]
    pub root: String,
    pub links: Vec<String>,
}

impl WorkItem {
    pub fn new(root: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            root: root.into(),
            links,
        }
    }
}

/// Keeps only the links the follow flags allow
///
/// With both flags set, or both cleared, every link is kept. Otherwise a link
/// is kept when its scope relative to `item.root` matches the set flag; links
/// whose scope cannot be determined are dropped.
pub fn filter_links(item: WorkItem, follow_internal: bool, follow_external: bool) -> WorkItem {
    if follow_internal == follow_external {
        return item;
    }

    let before = item.links.len();
    let links: Vec<String> = item
        .links
        .into_iter()
        .filter(|link| {
            classify_link(&item.root, link)
                .map(|scope| scope.is_followed(follow_internal, follow_external))
                .unwrap_or(false)
        })
        .collect();

    if links.len() < before {
        tracing::debug!(
            "Filtered {} of {} links from {}",
            before - links.len(),
            before,
            item.root
        );
    }

    WorkItem {
        root: item.root,
        links,
    }
}

/// Limits the frontier to `breadth`
///
/// Every item with more than `breadth` links keeps a uniformly random subset of
/// exactly `breadth` links, and when there are more than `breadth` items a
/// uniformly random subset of exactly `breadth` items survives. Unbounded
/// breadth leaves the frontier untouched.
pub fn sample<R: Rng + ?Sized>(items: Vec<WorkItem>, breadth: Bound, rng: &mut R) -> Vec<WorkItem> {
    let Some(limit) = breadth.limit() else {
        return items;
    };

    let mut items: Vec<WorkItem> = items
        .into_iter()
        .map(|mut item| {
            truncate_random(&mut item.links, limit, rng);
            item
        })
        .collect();

    truncate_random(&mut items, limit, rng);
    items
}

fn truncate_random<T, R: Rng + ?Sized>(values: &mut Vec<T>, limit: usize, rng: &mut R) {
    if values.len() > limit {
        values.shuffle(rng);
        values.truncate(limit);
    }
}
