//! Inspection of existing stores.
//!
//! Discovers the tables of a store file at runtime and exposes each as a
//! [`DynamicTable`] whose records are plain [`Row`]s. Used by the CLI,
//! where no compiled record types are available.

use crate::codec::Row;
use crate::engine::Store;
use crate::engine::connection::{self, JournalMode, Location, StoreOptions};
use crate::engine::lifecycle;
use crate::error::{CodecError, Result, StorageError};
use crate::schema::column::is_identifier;
use crate::schema::{
    ColumnMarker, DatabaseDefinition, ID_COLUMN, Table, TableDefinition, TableSchema,
    derive_columns,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A table discovered at runtime. Records are rows, passed through as-is.
#[derive(Debug, Clone)]
pub struct DynamicTable {
    definition: Arc<TableDefinition>,
}

impl DynamicTable {
    /// Wraps an existing definition.
    #[must_use]
    pub const fn new(definition: Arc<TableDefinition>) -> Self {
        Self { definition }
    }
}

impl TableSchema for DynamicTable {
    fn name(&self) -> &str {
        self.definition.name()
    }

    fn markers(&self) -> Vec<ColumnMarker> {
        self.definition
            .columns()
            .iter()
            .map(|c| ColumnMarker::owned(c.name.clone(), c.column_type.keyword()))
            .collect()
    }

    // Discovered per store, so never shared through the process-wide cache.
    fn definition(&self) -> Arc<TableDefinition> {
        Arc::clone(&self.definition)
    }
}

impl Table for DynamicTable {
    type Record = Row;

    fn encode(&self, record: &Row) -> std::result::Result<Row, CodecError> {
        Ok(record.clone())
    }

    fn decode(&self, row: &Row) -> std::result::Result<Row, CodecError> {
        Ok(row.clone())
    }
}

/// Opens an existing store file for inspection.
///
/// Tables and the stored version are read from the file. No tables are
/// created, no upgrades run, and the journal mode is left as found.
///
/// # Errors
///
/// Returns [`StorageError::NotFound`] if the file does not exist, or a
/// database error if it cannot be read.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Store> {
    let path = path.as_ref().to_path_buf();
    let location = Location::File(path.clone());
    let options = StoreOptions {
        journal_mode: JournalMode::Unchanged,
        ..StoreOptions::default()
    };
    let conn = connection::open(&location, options, false)?;

    let version = lifecycle::stored_version(&conn)?;
    let tables = discover(&conn)?;
    drop(conn);

    let name = path
        .file_stem()
        .map_or_else(|| "store".to_string(), |s| s.to_string_lossy().into_owned());
    debug!(%name, version, tables = tables.len(), "inspected store");

    let mut builder = DatabaseDefinition::builder(name, version.max(1));
    for table in tables {
        builder = builder.table_definition(table);
    }
    let database = builder.build_unchecked();
    Ok(Store::attach(path, database, options))
}

/// Looks up a discovered table by name.
///
/// # Errors
///
/// Returns [`StorageError::TableNotFound`] if the store has no such table.
pub fn table(store: &Store, name: &str) -> Result<DynamicTable> {
    store
        .definition()
        .table(name)
        .map(|def| DynamicTable::new(Arc::clone(def)))
        .ok_or_else(|| {
            StorageError::TableNotFound {
                name: name.to_string(),
            }
            .into()
        })
}

fn discover(conn: &Connection) -> Result<Vec<Arc<TableDefinition>>> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .map_err(StorageError::from)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(StorageError::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StorageError::from)?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        if !is_identifier(&name) {
            warn!(table = %name, "skipping table with non-identifier name");
            continue;
        }
        let markers = table_markers(conn, &name)?;
        let columns = derive_columns(&name, &markers);
        tables.push(Arc::new(TableDefinition::new(name, columns)));
    }
    Ok(tables)
}

fn table_markers(conn: &Connection, table: &str) -> Result<Vec<ColumnMarker>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(StorageError::from)?;
    let markers = stmt
        .query_map([], |row| {
            Ok(ColumnMarker::owned(
                row.get::<_, String>("name")?,
                row.get::<_, String>("type")?,
            ))
        })
        .map_err(StorageError::from)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StorageError::from)?;

    Ok(markers
        .into_iter()
        .filter(|m| m.name != ID_COLUMN)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use crate::engine::Filter;
    use crate::schema::ColumnType;
    use tempfile::TempDir;

    fn seeded(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("seeded.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE Pets(_id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, age INTEGER, chip BLOB);
             INSERT INTO Pets (name, age, chip) VALUES ('Rex', 4, x'0102');
             INSERT INTO Pets (name, age) VALUES ('Tom', 2);
             PRAGMA user_version = 3;",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_open_missing_store() {
        let temp = TempDir::new().unwrap();
        let err = open(temp.path().join("nope.db")).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::NotFound { .. })
        ));
        assert!(!temp.path().join("nope.db").exists());
    }

    #[test]
    fn test_discovers_tables_and_columns() {
        let temp = TempDir::new().unwrap();
        let store = open(seeded(temp.path())).unwrap();
        assert_eq!(store.definition().version(), 3);
        assert_eq!(store.stored_version().unwrap(), 3);

        let pets = table(&store, "Pets").unwrap();
        let def = pets.definition();
        let columns: Vec<_> = def
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.column_type.clone()))
            .collect();
        assert_eq!(
            columns,
            vec![
                ("name", ColumnType::Text),
                ("age", ColumnType::Integer),
                ("chip", ColumnType::Blob),
            ]
        );
        assert!(table(&store, "Cars").is_err());
    }

    #[test]
    fn test_dynamic_rows() {
        let temp = TempDir::new().unwrap();
        let store = open(seeded(temp.path())).unwrap();
        let pets = table(&store, "Pets").unwrap();

        let rex = store
            .query_one(&pets, Some(&Filter::equals("name", "Rex")))
            .unwrap()
            .unwrap();
        assert_eq!(rex.integer("age").unwrap(), 4);
        assert_eq!(rex.blob("chip").unwrap(), &[1, 2]);

        let tom = store
            .query_one(&pets, Some(&Filter::equals("name", "Tom")))
            .unwrap()
            .unwrap();
        assert_eq!(tom.get("chip"), Some(&Value::Null));

        assert_eq!(store.delete(&pets, Some(&Filter::equals("name", "Tom"))).unwrap(), 1);
        assert_eq!(store.count(&pets, None).unwrap(), 1);
        assert_eq!(store.stored_version().unwrap(), 3);
    }
}
