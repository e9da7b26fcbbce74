//! Find-or-create over natural keys
//!
//! [`resolve`] is the single idempotency primitive of the storage layer: every
//! entity and every relation row goes through it.

use crate::storage::traits::{Record, StorageResult};
use rusqlite::{params_from_iter, Connection, OptionalExtension};

/// Outcome of resolving a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Identifier of the matching (or newly inserted) row
    pub id: i64,

    /// Whether this call inserted the row
    pub created: bool,
}

/// Returns the id of the row matching `record`'s natural key, inserting it first
/// if no such row exists
///
/// Equality covers the entire key tuple. Two observations that differ in any
/// key column (a library seen with two confidence scores, say) resolve to two
/// distinct rows.
///
/// The lookup and the insert run on the same connection without a
/// transaction; callers serialize access through a [`Session`](super::Session).
pub fn resolve<R: Record>(conn: &Connection, record: &R) -> StorageResult<Resolved> {
    let keys = record.key_values();

    if let Some(id) = find(conn, record, &keys)? {
        return Ok(Resolved { id, created: false });
    }

    let id = insert(conn, record, keys)?;
    tracing::trace!("Inserted {} row {}", record.table(), id);

    Ok(Resolved { id, created: true })
}

fn find<R: Record>(
    conn: &Connection,
    record: &R,
    keys: &[rusqlite::types::Value],
) -> StorageResult<Option<i64>> {
    let predicate = record
        .key_columns()
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} IS ?{}", column, i + 1))
        .collect::<Vec<_>>()
        .join(" AND ");

    let sql = format!(
        "SELECT {} FROM {} WHERE {} LIMIT 1",
        record.id_column(),
        record.table(),
        predicate
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let id = stmt
        .query_row(params_from_iter(keys.iter()), |row| row.get(0))
        .optional()?;

    Ok(id)
}

fn insert<R: Record>(
    conn: &Connection,
    record: &R,
    keys: Vec<rusqlite::types::Value>,
) -> StorageResult<i64> {
    let columns: Vec<&str> = record
        .key_columns()
        .iter()
        .chain(record.extra_columns())
        .copied()
        .collect();

    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        record.table(),
        columns.join(", "),
        placeholders
    );

    let mut values = keys;
    values.extend(record.extra_values());

    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.execute(params_from_iter(values.iter()))?;

    Ok(conn.last_insert_rowid())
}
