use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

/// Main configuration structure for Webstack-Census
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Crawler traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of link-hops followed from each seed
    pub depth: Bound,

    /// Maximum number of links followed per work item, and work items per wave
    #[serde(default = "Bound::unbounded")]
    pub breadth: Bound,

    /// Follow links whose registrable domain differs from the origin page
    #[serde(rename = "follow-external", default)]
    pub follow_external: bool,

    /// Follow links whose registrable domain matches the origin page
    #[serde(rename = "follow-internal", default = "default_true")]
    pub follow_internal: bool,

    /// Maximum number of simultaneous page visits
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Seed URL sources
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputConfig {
    /// Seed URLs listed inline
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Optional file with one seed per line
    pub file: Option<String>,

    /// Prepended to every line read from `file`
    #[serde(default)]
    pub prefix: String,

    /// Appended to every line read from `file`
    #[serde(default)]
    pub suffix: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How long a visit waits for the store before giving up (milliseconds)
    #[serde(rename = "lock-timeout-ms", default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

/// A non-negative limit that may also be lifted entirely
///
/// Deserializes from an integer or from the string `"unbounded"` (`"max"` is
/// accepted as an alias).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Limited(u32),
    Unbounded,
}

impl Bound {
    pub fn unbounded() -> Self {
        Self::Unbounded
    }

    /// Returns the limit, or `None` when unbounded
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Limited(n) => Some(*n as usize),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{}", n),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BoundVisitor;

        impl<'de> Visitor<'de> for BoundVisitor {
            type Value = Bound;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or \"unbounded\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Bound, E> {
                u32::try_from(v)
                    .map(Bound::Limited)
                    .map_err(|_| E::custom(format!("limit out of range: {}", v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Bound, E> {
                u32::try_from(v)
                    .map(Bound::Limited)
                    .map_err(|_| E::custom(format!("limit out of range: {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Bound, E> {
                match v {
                    "unbounded" | "max" => Ok(Bound::Unbounded),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(BoundVisitor)
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> u32 {
    4
}

fn default_crawler_name() -> String {
    "webstack-census".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_lock_timeout_ms() -> u64 {
    10_000
}
