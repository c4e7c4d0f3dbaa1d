//! # Tablekit
//!
//! A small typed mapping layer over an embedded `SQLite` store.
//!
//! Each table type declares its columns as ordered name and type-tag
//! markers plus a pair of encode/decode functions between its record type
//! and a [`Row`]. From those declarations tablekit derives the schema,
//! creates tables on first open, runs caller-supplied upgrade statements
//! when the declared version rises, and offers generic CRUD over any
//! registered table.
//!
//! ## Features
//!
//! - **Schema registry**: column definitions derived once per table type
//! - **Row codec**: tagged values with typed accessors
//! - **CRUD engine**: transactional insert, batch insert, query, update, delete
//! - **Lifecycle**: version-gated creation and atomic upgrades
//! - **Inspection**: a CLI that reads any store's tables at runtime

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod codec;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod schema;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export schema types
pub use schema::{
    ColumnDefinition, ColumnMarker, ColumnType, DatabaseDefinition, ID_COLUMN, Table,
    TableDefinition, TableSchema, UpgradeSource,
};

// Re-export codec types
pub use codec::{Row, Value};

// Re-export engine types
pub use engine::{Direction, Filter, Query, SchemaState, Store, StoreOptions};
