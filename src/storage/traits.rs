//! Storage traits and error types
//!
//! This module defines the [`Record`] trait that every persisted entity and
//! relation implements, and the error type shared by the storage layer.

use rusqlite::types::Value;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store busy: connection not acquired within {waited_ms}ms")]
    Contention { waited_ms: u64 },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A row that can be found or created by its natural key
///
/// Implementors describe where they live and which columns identify them.
/// The resolver compares every key column for equality (NULL matches NULL)
/// and only writes the non-key columns when it inserts a new row; existing
/// rows are never updated through this trait.
pub trait Record {
    /// Table holding the row
    fn table(&self) -> &'static str;

    /// Column holding the surrogate identifier
    ///
    /// Junction tables have no surrogate column of their own and use SQLite's
    /// implicit `rowid`.
    fn id_column(&self) -> &'static str {
        "rowid"
    }

    /// Columns forming the natural key, in the order of [`Record::key_values`]
    fn key_columns(&self) -> &'static [&'static str];

    /// Values of the natural key
    fn key_values(&self) -> Vec<Value>;

    /// Non-key columns written on insert, in the order of [`Record::extra_values`]
    fn extra_columns(&self) -> &'static [&'static str] {
        &[]
    }

    /// Values of the non-key columns
    fn extra_values(&self) -> Vec<Value> {
        Vec::new()
    }
}
