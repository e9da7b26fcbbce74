//! Visited registry
//!
//! A url counts as visited once a Site row exists for it. Lookups ignore a
//! single trailing slash, so `https://a.example/` and `https://a.example` are
//! the same page.

use crate::storage::sqlite::Database;
use crate::storage::traits::StorageResult;
use crate::url::strip_trailing_slash;
use rusqlite::{params, Connection};

/// Answers "has this url already been crawled as a Site?"
#[derive(Clone)]
pub struct VisitedRegistry {
    db: Database,
}

impl VisitedRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Checks whether `url` has a Site row
    ///
    /// # Arguments
    ///
    /// * `url` - The url to look up, with or without a trailing slash
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A Site row exists for the url
    /// * `Ok(false)` - The url has not been crawled
    /// * `Err(StorageError)` - The lookup failed or the store was busy
    pub async fn is_visited(&self, url: &str) -> StorageResult<bool> {
        let session = self.db.session().await?;
        is_visited_in(session.conn(), url)
    }
}

/// Same as [`VisitedRegistry::is_visited`] on an already-held connection
pub(crate) fn is_visited_in(conn: &Connection, url: &str) -> StorageResult<bool> {
    let bare = strip_trailing_slash(url);
    let slashed = format!("{}/", bare);

    let mut stmt =
        conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM website WHERE url = ?1 OR url = ?2)")?;
    let exists: bool = stmt.query_row(params![bare, slashed], |row| row.get(0))?;

    Ok(exists)
}

/// Flips `already_visited` on every Hyperlink row pointing at `url`
///
/// Only rows that are still unvisited are touched; the flag never goes back to
/// false. Returns the number of rows flipped.
pub(crate) fn mark_hyperlinks_visited(conn: &Connection, url: &str) -> StorageResult<usize> {
    let bare = strip_trailing_slash(url);
    let slashed = format!("{}/", bare);

    let mut stmt = conn.prepare_cached(
        "UPDATE hyperlink SET already_visited = 1
         WHERE already_visited = 0 AND (url = ?1 OR url = ?2)",
    )?;
    let flipped = stmt.execute(params![bare, slashed])?;

    if flipped > 0 {
        tracing::debug!("Marked {} hyperlink(s) to {} as visited", flipped, bare);
    }

    Ok(flipped)
}
