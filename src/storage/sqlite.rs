//! SQLite store handle
//!
//! One [`Database`] is shared by every concurrent page visit. Access to the
//! underlying connection is serialized: a visit takes a [`Session`] for the
//! whole of an ingestion or a visited-check and gives it back when dropped.

use crate::storage::resolver::{resolve, Resolved};
use crate::storage::schema::{initialize_schema, TABLES};
use crate::storage::traits::{Record, StorageError, StorageResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared handle to the census database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    lock_timeout: Duration,
}

impl Database {
    /// Opens (or creates) the database file and applies the schema
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `lock_timeout` - How long a caller waits for the connection before
    ///   giving up with [`StorageError::Contention`]
    ///
    /// # Returns
    ///
    /// * `Ok(Database)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path, lock_timeout: Duration) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        // Other processes writing the same file
        conn.busy_timeout(lock_timeout)?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened database at {}", path.display());

        Ok(Self::from_connection(conn, lock_timeout))
    }

    /// Creates an in-memory database with the schema applied
    pub fn open_in_memory(lock_timeout: Duration) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn, lock_timeout))
    }

    fn from_connection(conn: Connection, lock_timeout: Duration) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            lock_timeout,
        }
    }

    /// Waits for exclusive use of the connection
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - The connection is held until the session is dropped
    /// * `Err(StorageError::Contention)` - The lock timeout elapsed first
    pub async fn session(&self) -> StorageResult<Session> {
        match tokio::time::timeout(self.lock_timeout, self.conn.clone().lock_owned()).await {
            Ok(guard) => Ok(Session { guard }),
            Err(_) => {
                let waited_ms = self.lock_timeout.as_millis() as u64;
                tracing::warn!("Gave up waiting for the database after {}ms", waited_ms);
                Err(StorageError::Contention { waited_ms })
            }
        }
    }
}

/// Exclusive use of the connection for one unit of work
pub struct Session {
    guard: OwnedMutexGuard<Connection>,
}

impl Session {
    pub fn conn(&self) -> &Connection {
        &self.guard
    }

    /// Finds or creates `record`; see [`resolve`]
    pub fn resolve<R: Record>(&self, record: &R) -> StorageResult<Resolved> {
        resolve(&self.guard, record)
    }

    /// Row count of every table, in schema order
    pub fn table_counts(&self) -> StorageResult<Vec<(&'static str, i64)>> {
        TABLES
            .iter()
            .map(|table| {
                let count: i64 = self.guard.query_row(
                    &format!("SELECT COUNT(*) FROM {}", table),
                    [],
                    |row| row.get(0),
                )?;
                Ok((*table, count))
            })
            .collect()
    }
}
