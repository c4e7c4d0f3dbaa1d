//! Error types for tablekit operations.
//!
//! This module provides the error hierarchy using `thiserror` for schema
//! configuration, row marshalling, store access, and CLI commands. Write
//! failures are always reported as errors, so "no matching rows" (`Ok(0)`)
//! is distinguishable from "the operation failed" (`Err`).

use thiserror::Error;

/// Result type alias for tablekit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Store-related errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Row encode/decode errors.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid database or table definition.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

/// Errors raised while talking to the embedded store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or statement error.
    #[error("database error: {0}")]
    Database(String),

    /// The store file does not exist (inspection never creates one).
    #[error("store not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: String,
    },

    /// A write failed and its transaction was rolled back.
    #[error("{operation} on {table} rolled back: {reason}")]
    RolledBack {
        /// Operation name (`insert`, `update`, ...).
        operation: &'static str,
        /// Table the write targeted.
        table: String,
        /// Underlying failure.
        reason: String,
    },

    /// A read failed.
    #[error("query on {table} failed: {reason}")]
    Query {
        /// Table being read.
        table: String,
        /// Underlying failure.
        reason: String,
    },

    /// An upgrade statement failed; the upgrade transaction was rolled back.
    #[error("upgrade from version {from} to {to} failed: {reason}")]
    Upgrade {
        /// Stored version before the upgrade.
        from: u32,
        /// Declared version.
        to: u32,
        /// Underlying failure.
        reason: String,
    },

    /// The stored version is newer than the declared version.
    #[error("store is at version {stored}, newer than declared version {declared}")]
    Downgrade {
        /// Version found in the store.
        stored: u32,
        /// Version of the database definition.
        declared: u32,
    },

    /// A filter or ordering references a column the table does not declare.
    #[error("unknown column {column} for table {table}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
    },

    /// An update was requested with no column values.
    #[error("update on {table} has no values to set")]
    EmptyUpdate {
        /// Table name.
        table: String,
    },

    /// The table is not part of the store's database definition.
    #[error("table not registered: {name}")]
    TableNotFound {
        /// Table name.
        name: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while encoding records into rows or decoding rows back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The row has no value for a column the decoder asked for.
    #[error("missing column: {column}")]
    MissingColumn {
        /// Column name.
        column: String,
    },

    /// The value stored under a column has a different tag than requested.
    #[error("column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Requested tag.
        expected: &'static str,
        /// Actual tag.
        found: &'static str,
    },

    /// The row contains a column the table does not declare.
    #[error("column {column} is not declared by table {table}")]
    UndeclaredColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// An integer value does not fit the record's field type.
    #[error("column {column}: value {value} out of range")]
    OutOfRange {
        /// Column name.
        column: String,
        /// Stored value.
        value: i64,
    },

    /// Record-specific encode/decode failure.
    #[error("{0}")]
    Custom(String),
}

impl CodecError {
    /// Creates a record-specific codec error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Errors in a database or table definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Database versions start at 1.
    #[error("database version must be at least 1, got {0}")]
    InvalidVersion(u32),

    /// Database or table name is not a plain SQL identifier.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Two tables share a name within one database definition.
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::RolledBack {
            operation: "insert",
            table: "CarTable".to_string(),
            reason: "constraint failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "insert on CarTable rolled back: constraint failed"
        );

        let err = StorageError::Downgrade {
            stored: 3,
            declared: 2,
        };
        assert_eq!(
            err.to_string(),
            "store is at version 3, newer than declared version 2"
        );
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::TypeMismatch {
            column: "name".to_string(),
            expected: "TEXT",
            found: "INTEGER",
        };
        assert_eq!(err.to_string(), "column name: expected TEXT, found INTEGER");

        let err = CodecError::custom("bad record");
        assert_eq!(err.to_string(), "bad record");
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::InvalidVersion(0).to_string(),
            "database version must be at least 1, got 0"
        );
        assert_eq!(
            ConfigError::DuplicateTable("CarTable".to_string()).to_string(),
            "duplicate table name: CarTable"
        );
    }

    #[test]
    fn test_error_from_storage() {
        let err: Error = StorageError::TableNotFound {
            name: "x".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_error_from_codec() {
        let err: Error = CodecError::MissingColumn {
            column: "name".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Codec(_)));
        assert_eq!(err.to_string(), "codec error: missing column: name");
    }

    #[test]
    fn test_from_rusqlite_error_to_error() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: Error = rusqlite_err.into();
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    fn test_from_serde_json_error_to_storage_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
