//! Physical connection opening and configuration.

use crate::error::{Result, StorageError};
use rusqlite::Connection;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A database file. Connections are opened and closed per operation.
    File(PathBuf),
    /// A private in-memory database. The single connection is kept for the
    /// store's lifetime, since closing it would discard the data.
    Memory,
}

impl Location {
    /// File path, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Memory => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(":memory:"),
        }
    }
}

/// `SQLite` journal mode applied to file-backed stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Rollback journal, deleted after each transaction.
    Delete,
    /// Write-ahead log.
    #[default]
    Wal,
    /// Whatever mode the file already uses.
    Unchanged,
}

impl JournalMode {
    const fn pragma(self) -> Option<&'static str> {
        match self {
            Self::Delete => Some("PRAGMA journal_mode = DELETE;"),
            Self::Wal => Some("PRAGMA journal_mode = WAL;"),
            Self::Unchanged => None,
        }
    }
}

/// Settings applied on every physical open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Enforce `FOREIGN KEY` constraints.
    pub foreign_keys: bool,
    /// Journal mode for file-backed stores.
    pub journal_mode: JournalMode,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            journal_mode: JournalMode::Wal,
        }
    }
}

/// Opens and configures a connection.
///
/// When `create` is false a missing file is reported as
/// [`StorageError::NotFound`] instead of being created.
pub(crate) fn open(location: &Location, options: StoreOptions, create: bool) -> Result<Connection> {
    let conn = match location {
        Location::File(path) => {
            if !create && !path.exists() {
                return Err(StorageError::NotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Database(e.to_string()))?;
            }
            Connection::open(path).map_err(StorageError::from)?
        }
        Location::Memory => Connection::open_in_memory().map_err(StorageError::from)?,
    };

    let foreign_keys = if options.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))
        .map_err(StorageError::from)?;

    if let (Location::File(_), Some(pragma)) = (location, options.journal_mode.pragma()) {
        // journal_mode returns the resulting mode as a row
        let _: String = conn
            .query_row(pragma, [], |row| row.get(0))
            .map_err(StorageError::from)?;
    }

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_in_memory() {
        let conn = open(&Location::Memory, StoreOptions::default(), true).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.db");
        let location = Location::File(path.clone());
        open(&location, StoreOptions::default(), true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_missing_without_create() {
        let temp = TempDir::new().unwrap();
        let location = Location::File(temp.path().join("missing.db"));
        let err = open(&location, StoreOptions::default(), false).unwrap_err();
        assert!(err.to_string().contains("store not found"));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::Memory.to_string(), ":memory:");
        assert!(Location::Memory.path().is_none());
    }
}
