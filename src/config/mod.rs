//! Configuration module for Webstack-Census
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and collecting seed URLs from the configured sources.
//!
//! # Example
//!
//! ```no_run
//! use webstack_census::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("census.toml")).unwrap();
//! println!("Crawler will follow links to depth: {}", config.crawler.depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Bound, Config, CrawlerConfig, FetcherConfig, InputConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_seeds};
