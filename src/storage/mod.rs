//! Storage module for persisting census data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Find-or-create resolution of entities and relations by natural key
//! - The visited registry used to avoid re-crawling pages
//! - Serialized access to the shared connection

mod records;
mod resolver;
mod schema;
mod sqlite;
mod traits;
mod visited;

pub use records::{
    AdTrackingRecord, FrameworkRecord, HyperlinkRecord, LanguageRecord, LibraryRecord,
    ModuleFileRecord, ModuleFunctionRecord, ModuleUsageRecord, Relation, RelationRecord,
    SiteRecord,
};
pub use resolver::{resolve, Resolved};
pub use schema::{initialize_schema, TABLES};
pub use sqlite::{Database, Session};
pub use traits::{Record, StorageError, StorageResult};
pub use visited::VisitedRegistry;

pub(crate) use visited::{is_visited_in, mark_hyperlinks_visited};

use std::path::Path;
use std::time::Duration;

/// Opens the census database at `path`, creating it if needed
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `lock_timeout_ms` - Connection lock timeout in milliseconds
///
/// # Returns
///
/// * `Ok(Database)` - Successfully opened database
/// * `Err(StorageError)` - Failed to open database
pub fn open_database(path: &Path, lock_timeout_ms: u64) -> StorageResult<Database> {
    Database::open(path, Duration::from_millis(lock_timeout_ms))
}
