//! Schema layer for tablekit.
//!
//! Table types declare column markers; the registry derives an ordered,
//! typed [`TableDefinition`] from them once per type, and a
//! [`DatabaseDefinition`] groups the tables of one store with its version
//! and upgrade statements.

pub mod column;
pub mod database;
pub mod registry;
pub mod table;

pub use column::{ColumnDefinition, ColumnMarker, ColumnType, ID_COLUMN, derive_columns};
pub use database::{DB_SUFFIX, DatabaseBuilder, DatabaseDefinition, UpgradeSource};
pub use table::{Table, TableDefinition, TableSchema};
