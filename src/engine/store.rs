//! The CRUD engine.
//!
//! A [`Store`] owns one database definition and one physical handle. Every
//! operation acquires a session on entry and releases it on every exit
//! path. File-backed stores open a fresh connection per session and close
//! it on release; in-memory stores keep their single connection.
//!
//! Every operation first checks that its table belongs to the store's
//! database definition and fails with [`StorageError::TableNotFound`]
//! otherwise.
//!
//! # Concurrency
//!
//! Sessions are serialized by a mutex, so a `Store` may be shared between
//! threads, but calls never interleave: each runs to commit or rollback
//! before the next one starts. Callers wanting parallel access open one
//! store per thread and rely on `SQLite`'s own locking.

use crate::codec::{Row, Value};
use crate::engine::connection::{self, Location, StoreOptions};
use crate::engine::filter::{Filter, Query};
use crate::engine::lifecycle::{self, SchemaState};
use crate::engine::sql;
use crate::error::{Error, Result, StorageError};
use crate::schema::{DatabaseDefinition, Table, TableDefinition};
use rusqlite::{Connection, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// A store bound to one database definition.
///
/// # Examples
///
/// ```
/// use tablekit::codec::Row;
/// use tablekit::engine::{Filter, Store};
/// use tablekit::error::CodecError;
/// use tablekit::schema::{ColumnMarker, DatabaseDefinition, Table, TableSchema};
///
/// struct NoteTable;
///
/// impl TableSchema for NoteTable {
///     fn name(&self) -> &str {
///         "NoteTable"
///     }
///
///     fn markers(&self) -> Vec<ColumnMarker> {
///         vec![ColumnMarker::new("body", "TEXT")]
///     }
/// }
///
/// impl Table for NoteTable {
///     type Record = String;
///
///     fn encode(&self, body: &String) -> Result<Row, CodecError> {
///         Ok(Row::new().with("body", body.as_str()))
///     }
///
///     fn decode(&self, row: &Row) -> Result<String, CodecError> {
///         Ok(row.text("body")?.to_string())
///     }
/// }
///
/// let database = DatabaseDefinition::builder("Notes", 1).table(&NoteTable).build().unwrap();
/// let store = Store::in_memory(database).unwrap();
/// store.insert(&NoteTable, &"hello".to_string()).unwrap();
/// let found = store.query_one(&NoteTable, Some(&Filter::equals("body", "hello"))).unwrap();
/// assert_eq!(found.as_deref(), Some("hello"));
/// ```
#[derive(Debug)]
pub struct Store {
    database: DatabaseDefinition,
    location: Location,
    options: StoreOptions,
    manage_schema: bool,
    slot: Mutex<Option<Connection>>,
    state: Mutex<SchemaState>,
}

impl Store {
    /// Opens (creating if needed) the store `<dir>/<name>.db`.
    ///
    /// Runs table creation or upgrades immediately, so schema problems
    /// surface here rather than on the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the lifecycle
    /// transition fails.
    pub fn open<P: AsRef<Path>>(dir: P, database: DatabaseDefinition) -> Result<Self> {
        Self::open_with(dir, database, StoreOptions::default())
    }

    /// Like [`Store::open`] with explicit connection options.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the lifecycle
    /// transition fails.
    pub fn open_with<P: AsRef<Path>>(
        dir: P,
        database: DatabaseDefinition,
        options: StoreOptions,
    ) -> Result<Self> {
        let path = dir.as_ref().join(database.file_name());
        Self::connect_eagerly(database, Location::File(path), options, true)
    }

    /// Creates a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if table creation fails.
    pub fn in_memory(database: DatabaseDefinition) -> Result<Self> {
        Self::connect_eagerly(database, Location::Memory, StoreOptions::default(), true)
    }

    /// Attaches to an existing file without running lifecycle transitions.
    pub(crate) fn attach(path: PathBuf, database: DatabaseDefinition, options: StoreOptions) -> Self {
        Self::new(database, Location::File(path), options, false)
    }

    fn new(
        database: DatabaseDefinition,
        location: Location,
        options: StoreOptions,
        manage_schema: bool,
    ) -> Self {
        Self {
            database,
            location,
            options,
            manage_schema,
            slot: Mutex::new(None),
            state: Mutex::new(SchemaState::Uncreated),
        }
    }

    fn connect_eagerly(
        database: DatabaseDefinition,
        location: Location,
        options: StoreOptions,
        manage_schema: bool,
    ) -> Result<Self> {
        let store = Self::new(database, location, options, manage_schema);
        store.with_session(|_| Ok(()))?;
        Ok(store)
    }

    /// The database definition.
    #[must_use]
    pub const fn definition(&self) -> &DatabaseDefinition {
        &self.database
    }

    /// The store file, or `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.location.path()
    }

    /// Where the store lives.
    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// Schema state as of the most recent physical open.
    #[must_use]
    pub fn schema_state(&self) -> SchemaState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the version recorded in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn stored_version(&self) -> Result<u32> {
        self.with_session(|conn| lifecycle::stored_version(conn))
    }

    // ==================== Sessions ====================

    /// Runs `f` with an acquired connection, releasing it afterwards.
    fn with_session<R>(&self, f: impl FnOnce(&mut Connection) -> Result<R>) -> Result<R> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };
        debug!(location = %self.location, "session acquired");

        let result = f(&mut conn);

        match self.location {
            Location::Memory => *slot = Some(conn),
            Location::File(_) => {
                if let Err((_, e)) = conn.close() {
                    warn!(location = %self.location, error = %e, "failed to close connection");
                }
            }
        }
        debug!(location = %self.location, "session released");
        result
    }

    fn connect(&self) -> Result<Connection> {
        let mut conn = connection::open(&self.location, self.options, self.manage_schema)?;

        let transition = if self.manage_schema {
            lifecycle::prepare(&mut conn, &self.database)?
        } else {
            None
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match transition {
            Some(next) => *state = next,
            None if *state == SchemaState::Uncreated => {
                let version = lifecycle::stored_version(&conn)?;
                if version > 0 {
                    *state = SchemaState::Created { version };
                }
            }
            None => {}
        }
        Ok(conn)
    }

    /// Resolves `table`'s definition, rejecting tables this store does not
    /// declare.
    fn registered<T: Table>(&self, table: &T) -> Result<Arc<TableDefinition>> {
        let def = table.definition();
        if self.database.table(def.name()).is_none() {
            return Err(StorageError::TableNotFound {
                name: def.name().to_string(),
            }
            .into());
        }
        Ok(def)
    }

    // ==================== Writes ====================

    /// Inserts one record and returns its new `_id`.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the record cannot be encoded, or
    /// [`StorageError::RolledBack`] if the write fails.
    pub fn insert<T: Table>(&self, table: &T, record: &T::Record) -> Result<i64> {
        let def = self.registered(table)?;
        self.with_session(|conn| {
            let row = table.encode(record)?;
            row.validate(&def)?;

            let tx = conn.transaction()?;
            let (statement, params) = sql::insert(&def, &row);
            tx.execute(&statement, params_from_iter(params))
                .map_err(|e| rolled_back("insert", &def, &e))?;
            let id = tx.last_insert_rowid();
            tx.commit().map_err(|e| rolled_back("insert", &def, &e))?;
            Ok(id)
        })
        .inspect_err(|e| warn!(table = def.name(), error = %e, "insert failed"))
    }

    /// Inserts records in one transaction and returns how many were written.
    ///
    /// All or nothing: if any record fails to encode or insert, no record
    /// from the batch is persisted.
    ///
    /// # Errors
    ///
    /// Returns the first encode or write failure.
    pub fn insert_many<T: Table>(&self, table: &T, records: &[T::Record]) -> Result<usize> {
        let def = self.registered(table)?;
        self.with_session(|conn| {
            let tx = conn.transaction()?;
            for record in records {
                let row = table.encode(record)?;
                row.validate(&def)?;
                let (statement, params) = sql::insert(&def, &row);
                tx.prepare_cached(&statement)
                    .and_then(|mut stmt| stmt.execute(params_from_iter(params)))
                    .map_err(|e| rolled_back("insert_many", &def, &e))?;
            }
            tx.commit()
                .map_err(|e| rolled_back("insert_many", &def, &e))?;
            Ok(records.len())
        })
        .inspect_err(|e| warn!(table = def.name(), error = %e, "batch insert rolled back"))
    }

    /// Sets the columns in `values` on every row matching `filter`.
    ///
    /// Without a filter every row in the table is updated. Returns the
    /// number of rows changed; `Ok(0)` means nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is empty or names undeclared columns,
    /// if the filter names unknown columns, or if the write fails.
    pub fn update<T: Table>(&self, table: &T, values: &Row, filter: Option<&Filter>) -> Result<usize> {
        let def = self.registered(table)?;
        if values.is_empty() {
            return Err(StorageError::EmptyUpdate {
                table: def.name().to_string(),
            }
            .into());
        }
        values.validate(&def)?;
        if let Some(filter) = filter {
            filter.check(&def)?;
        }

        self.write(&def, "update", sql::update(&def, values, filter))
    }

    /// Deletes every row matching `filter` and returns how many went.
    ///
    /// Without a filter the table is emptied.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter names unknown columns or the write
    /// fails.
    pub fn delete<T: Table>(&self, table: &T, filter: Option<&Filter>) -> Result<usize> {
        let def = self.registered(table)?;
        if let Some(filter) = filter {
            filter.check(&def)?;
        }
        self.write(&def, "delete", sql::delete(&def, filter))
    }

    /// Deletes every row in the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn delete_all<T: Table>(&self, table: &T) -> Result<usize> {
        self.delete(table, None)
    }

    fn write(
        &self,
        def: &TableDefinition,
        operation: &'static str,
        (statement, params): (String, Vec<&Value>),
    ) -> Result<usize> {
        self.with_session(|conn| {
            let tx = conn.transaction()?;
            let affected = tx
                .execute(&statement, params_from_iter(params))
                .map_err(|e| rolled_back(operation, def, &e))?;
            tx.commit().map_err(|e| rolled_back(operation, def, &e))?;
            debug!(table = def.name(), operation, affected, "write committed");
            Ok(affected)
        })
        .inspect_err(|e| warn!(table = def.name(), operation, error = %e, "write failed"))
    }

    // ==================== Reads ====================

    /// Returns the records matching `query`, in the requested order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query names unknown columns, the read fails,
    /// or a row cannot be decoded.
    pub fn query<T: Table>(&self, table: &T, query: &Query) -> Result<Vec<T::Record>> {
        let def = self.registered(table)?;
        query.check(&def)?;
        let (statement, params) = sql::select(&def, query);
        let rows = self.with_session(|conn| fetch(conn, &def, &statement, &params))?;
        decode_all(table, &rows)
    }

    /// Returns every record in the table, in store-native order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a row cannot be decoded.
    pub fn query_all<T: Table>(&self, table: &T) -> Result<Vec<T::Record>> {
        self.query(table, &Query::new())
    }

    /// Returns the first record matching `filter`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter names unknown columns, the read
    /// fails, or the row cannot be decoded.
    pub fn query_one<T: Table>(&self, table: &T, filter: Option<&Filter>) -> Result<Option<T::Record>> {
        let mut query = Query::new().limit(1);
        if let Some(filter) = filter {
            query = query.filter(filter.clone());
        }
        Ok(self.query(table, &query)?.into_iter().next())
    }

    /// Returns one record chosen uniformly at random, or `None` if the
    /// table is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the row cannot be decoded.
    pub fn query_random<T: Table>(&self, table: &T) -> Result<Option<T::Record>> {
        let def = self.registered(table)?;
        let statement = sql::select_random(&def);
        let rows = self.with_session(|conn| fetch(conn, &def, &statement, &[]))?;
        rows.first()
            .map(|row| table.decode(row).map_err(Error::from))
            .transpose()
    }

    /// Counts the rows matching `filter` (all rows without one).
    ///
    /// # Errors
    ///
    /// Returns an error if the filter names unknown columns or the read
    /// fails.
    pub fn count<T: Table>(&self, table: &T, filter: Option<&Filter>) -> Result<usize> {
        let def = self.registered(table)?;
        if let Some(filter) = filter {
            filter.check(&def)?;
        }
        let (statement, params) = sql::count(&def, filter);
        let count: i64 = self.with_session(|conn| {
            conn.query_row(&statement, params_from_iter(params), |row| row.get(0))
                .map_err(|e| read_failed(&def, &e))
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn rolled_back(operation: &'static str, def: &TableDefinition, err: &rusqlite::Error) -> Error {
    StorageError::RolledBack {
        operation,
        table: def.name().to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn read_failed(def: &TableDefinition, err: &rusqlite::Error) -> Error {
    StorageError::Query {
        table: def.name().to_string(),
        reason: err.to_string(),
    }
    .into()
}

fn fetch(conn: &Connection, def: &TableDefinition, statement: &str, params: &[&Value]) -> Result<Vec<Row>> {
    debug!(table = def.name(), %statement, "query");
    let mut stmt = conn.prepare(statement).map_err(|e| read_failed(def, &e))?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| Row::from_store(def, row))
        .map_err(|e| read_failed(def, &e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| read_failed(def, &e))?;
    Ok(rows)
}

fn decode_all<T: Table>(table: &T, rows: &[Row]) -> Result<Vec<T::Record>> {
    rows.iter()
        .map(|row| table.decode(row).map_err(Error::from))
        .collect()
}
