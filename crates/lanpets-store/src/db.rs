use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::schema::SCHEMA_SQL;

/// A handle to the on-disk sqlite file. Cheap to clone (just a path); every
/// call opens its own short-lived connection, per the "no locks outside the
/// store" resource model.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection, re-applying the WAL/foreign-key pragmas (sqlite
    /// does not persist `PRAGMA journal_mode`/`foreign_keys` across
    /// connections) and ensuring the schema exists.
    pub fn open(&self) -> Result<Connection, String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|error| format!("create data dir {}: {error}", parent.display()))?;
            }
        }
        let conn = Connection::open(&self.path).map_err(|error| format!("open sqlite: {error}"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")
            .map_err(|error| format!("set pragmas: {error}"))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|error| format!("create schema: {error}"))?;
        tracing::trace!(path = %self.path.display(), "opened sqlite connection");
        Ok(conn)
    }
}
