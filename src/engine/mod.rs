//! CRUD engine and store lifecycle.
//!
//! [`Store`] runs generic insert, query, update, and delete operations for
//! any [`Table`](crate::schema::Table), each inside its own transaction and
//! its own connection session. Opening a store creates its tables or
//! applies upgrade statements as the stored version requires.

pub mod connection;
pub mod filter;
pub mod lifecycle;
mod sql;
pub mod store;

pub use connection::{JournalMode, Location, StoreOptions};
pub use filter::{Direction, Filter, Query};
pub use lifecycle::SchemaState;
pub use store::Store;
