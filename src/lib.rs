//! Webstack-Census: a technology census crawler
//!
//! This crate crawls websites to a bounded depth and breadth, extracts the
//! technologies each page exposes (languages, libraries, frameworks, ad
//! tracking, embedded binary modules, hyperlinks) and persists them into a
//! normalized SQLite graph without duplicating entities across crawls.

pub mod config;
pub mod crawler;
pub mod ingest;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Webstack-Census operations
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Extraction error: {0}")]
    Extract(#[from] crawler::ExtractError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use ingest::{IngestOutcome, IngestPipeline, PageFacts};
pub use storage::{Database, VisitedRegistry};
pub use url::{classify_link, registrable_domain, strip_trailing_slash, LinkScope};
