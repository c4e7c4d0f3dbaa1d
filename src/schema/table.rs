//! Table definitions and the traits record tables implement.

use crate::codec::Row;
use crate::error::CodecError;
use crate::schema::column::{ColumnDefinition, ColumnMarker, ID_COLUMN};
use crate::schema::registry;
use serde::Serialize;
use std::sync::Arc;

/// Immutable schema description of one table: name plus ordered columns.
///
/// Built once per table type by the registry and shared afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    name: String,
    columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// Creates a definition from already-derived columns.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Table name as created in the store.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared columns, in declaration order. Does not include `_id`.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Looks up a declared column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if `name` is a declared column or the identity column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        name == ID_COLUMN || self.column(name).is_some()
    }

    /// Returns the `CREATE TABLE` statement for this table.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablekit::schema::{ColumnMarker, TableDefinition, derive_columns};
    ///
    /// let columns = derive_columns("Pets", &[ColumnMarker::new("name", "TEXT")]);
    /// let table = TableDefinition::new("Pets", columns);
    /// assert_eq!(
    ///     table.create_statement(),
    ///     "CREATE TABLE IF NOT EXISTS Pets(_id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)"
    /// );
    /// ```
    #[must_use]
    pub fn create_statement(&self) -> String {
        let mut statement = format!(
            "CREATE TABLE IF NOT EXISTS {}({ID_COLUMN} INTEGER PRIMARY KEY AUTOINCREMENT",
            self.name
        );
        for column in &self.columns {
            statement.push_str(", ");
            statement.push_str(&column.name);
            statement.push(' ');
            statement.push_str(column.column_type.keyword());
        }
        statement.push(')');
        statement
    }
}

/// Schema side of a table type: its name and its declared column markers.
pub trait TableSchema: Send + Sync + 'static {
    /// Table name. Must be unique within a database definition.
    fn name(&self) -> &str;

    /// Declared column markers, in declaration order.
    fn markers(&self) -> Vec<ColumnMarker>;

    /// Returns the memoized definition for this table type.
    fn definition(&self) -> Arc<TableDefinition>
    where
        Self: Sized,
    {
        registry::definition(self)
    }
}

/// A table that stores one record type.
///
/// Implementors describe how a record maps to a [`Row`] and back. Both
/// directions are pure: `encode` builds and returns a fresh row on every
/// call, so nothing from a previous record can leak into the next one.
///
/// # Examples
///
/// ```
/// use tablekit::codec::Row;
/// use tablekit::error::CodecError;
/// use tablekit::schema::{ColumnMarker, Table, TableSchema};
///
/// struct Pet {
///     name: String,
///     legs: i64,
/// }
///
/// struct PetTable;
///
/// impl TableSchema for PetTable {
///     fn name(&self) -> &str {
///         "PetTable"
///     }
///
///     fn markers(&self) -> Vec<ColumnMarker> {
///         vec![ColumnMarker::new("name", "TEXT"), ColumnMarker::new("legs", "INTEGER")]
///     }
/// }
///
/// impl Table for PetTable {
///     type Record = Pet;
///
///     fn encode(&self, pet: &Pet) -> Result<Row, CodecError> {
///         Ok(Row::new().with("name", pet.name.as_str()).with("legs", pet.legs))
///     }
///
///     fn decode(&self, row: &Row) -> Result<Pet, CodecError> {
///         Ok(Pet { name: row.text("name")?.to_string(), legs: row.integer("legs")? })
///     }
/// }
///
/// let row = PetTable.encode(&Pet { name: "Rex".into(), legs: 4 }).unwrap();
/// assert_eq!(PetTable.decode(&row).unwrap().legs, 4);
/// ```
pub trait Table: TableSchema {
    /// Application record stored in this table.
    type Record;

    /// Maps a record to a row. Columns left unset are omitted from writes.
    fn encode(&self, record: &Self::Record) -> Result<Row, CodecError>;

    /// Builds a new record from a fetched row.
    fn decode(&self, row: &Row) -> Result<Self::Record, CodecError>;
}
