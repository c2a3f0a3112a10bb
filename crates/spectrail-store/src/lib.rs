//! SQLite-backed run log for SpecTrail.
//!
//! One database file holds the project/task catalog, runs with their message
//! and tool-call transcripts, artifacts, and the settings key/value store.
//! The store is a single-writer resource: the connection sits behind a mutex
//! and every method takes `&self`, so a host that wants concurrency simply
//! shares one `Store`. Writes are synchronous and short by design; anything
//! long-running happens away from the connection.

mod artifacts;
mod catalog;
mod runs;
mod settings;

use rusqlite::Connection;
use spectrail_core::WorkbenchError;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("run {0} is closed")]
    RunClosed(String),
}

impl From<StoreError> for WorkbenchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => WorkbenchError::NotFound(what),
            other => WorkbenchError::Persistence(other.to_string()),
        }
    }
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and apply the schema.
    /// The schema uses `IF NOT EXISTS` throughout, so reopening is idempotent.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, used by tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
