//! Store lifecycle: table creation and version-gated upgrades.
//!
//! The schema version lives in `PRAGMA user_version`. A value of 0 means
//! the store has never been created. Both creation and upgrade run in a
//! single transaction together with the version bump, so a failed upgrade
//! leaves the store at its previous version.

use crate::error::{Result, StorageError};
use crate::schema::DatabaseDefinition;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

/// Schema state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchemaState {
    /// Not opened yet, or the store has no tables.
    Uncreated,
    /// Tables exist at this version.
    Created {
        /// Stored version.
        version: u32,
    },
    /// An upgrade ran during the last open.
    Upgraded {
        /// Version before the upgrade.
        from: u32,
        /// Version after the upgrade.
        to: u32,
    },
}

/// Reads the stored schema version.
pub(crate) fn stored_version(conn: &Connection) -> Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| StorageError::from(e).into())
}

/// Brings the store up to the declared version.
///
/// Returns the transition that happened, or `None` if the store was
/// already current.
pub(crate) fn prepare(conn: &mut Connection, database: &DatabaseDefinition) -> Result<Option<SchemaState>> {
    let stored = stored_version(conn)?;
    let declared = database.version();

    if stored == 0 {
        create(conn, database)?;
        return Ok(Some(SchemaState::Created { version: declared }));
    }
    if stored > declared {
        return Err(StorageError::Downgrade { stored, declared }.into());
    }
    if stored < declared {
        upgrade(conn, database, stored)?;
        return Ok(Some(SchemaState::Upgraded {
            from: stored,
            to: declared,
        }));
    }

    debug!(database = database.name(), version = stored, "schema current");
    Ok(None)
}

fn create(conn: &mut Connection, database: &DatabaseDefinition) -> Result<()> {
    let tx = conn.transaction().map_err(StorageError::from)?;
    for table in database.tables() {
        let statement = table.create_statement();
        debug!(%statement, "creating table");
        tx.execute_batch(&statement).map_err(StorageError::from)?;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {};", database.version()))
        .map_err(StorageError::from)?;
    tx.commit().map_err(StorageError::from)?;

    info!(
        database = database.name(),
        version = database.version(),
        tables = database.tables().len(),
        "created store"
    );
    Ok(())
}

fn upgrade(conn: &mut Connection, database: &DatabaseDefinition, from: u32) -> Result<()> {
    let to = database.version();
    let failed = |e: rusqlite::Error| StorageError::Upgrade {
        from,
        to,
        reason: e.to_string(),
    };

    let statements = database.upgrade_statements(from);
    let tx = conn.transaction().map_err(failed)?;
    for statement in &statements {
        debug!(%statement, "running upgrade statement");
        tx.execute_batch(statement).map_err(failed)?;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {to};"))
        .map_err(failed)?;
    tx.commit().map_err(failed)?;

    info!(
        database = database.name(),
        from,
        to,
        statements = statements.len(),
        "upgraded store"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMarker, TableDefinition, derive_columns};
    use std::sync::Arc;

    fn notes_table() -> Arc<TableDefinition> {
        Arc::new(TableDefinition::new(
            "Notes",
            derive_columns("Notes", &[ColumnMarker::new("body", "TEXT")]),
        ))
    }

    fn database(version: u32) -> DatabaseDefinition {
        DatabaseDefinition::builder("Lifecycle", version)
            .table_definition(notes_table())
            .upgrade(|old: u32| {
                let mut sql = Vec::new();
                if old < 2 {
                    sql.push("ALTER TABLE Notes ADD COLUMN title TEXT".to_string());
                }
                if old < 3 {
                    sql.push("CREATE TABLE IF NOT EXISTS Tags(_id INTEGER PRIMARY KEY AUTOINCREMENT, tag TEXT)".to_string());
                }
                sql
            })
            .build()
            .unwrap()
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            > 0
    }

    #[test]
    fn test_create_on_first_open() {
        let mut conn = Connection::open_in_memory().unwrap();
        let state = prepare(&mut conn, &database(1)).unwrap();
        assert_eq!(state, Some(SchemaState::Created { version: 1 }));
        assert!(table_exists(&conn, "Notes"));
        assert_eq!(stored_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_current_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        prepare(&mut conn, &database(1)).unwrap();
        assert_eq!(prepare(&mut conn, &database(1)).unwrap(), None);
    }

    #[test]
    fn test_upgrade_runs_statements_in_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        prepare(&mut conn, &database(1)).unwrap();

        let state = prepare(&mut conn, &database(3)).unwrap();
        assert_eq!(state, Some(SchemaState::Upgraded { from: 1, to: 3 }));
        assert!(table_exists(&conn, "Tags"));
        conn.execute("INSERT INTO Notes (body, title) VALUES ('b', 't')", [])
            .unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 3);
    }

    #[test]
    fn test_failed_upgrade_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        prepare(&mut conn, &database(1)).unwrap();

        let broken = DatabaseDefinition::builder("Lifecycle", 2)
            .table_definition(notes_table())
            .upgrade(|_: u32| {
                vec![
                    "CREATE TABLE Extra(x TEXT)".to_string(),
                    "THIS IS NOT SQL".to_string(),
                ]
            })
            .build()
            .unwrap();

        let err = prepare(&mut conn, &broken).unwrap_err();
        assert!(err.to_string().contains("upgrade from version 1 to 2 failed"));
        assert!(!table_exists(&conn, "Extra"));
        assert_eq!(stored_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_downgrade_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        prepare(&mut conn, &database(3)).unwrap();
        let err = prepare(&mut conn, &database(2)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::Downgrade {
                stored: 3,
                declared: 2
            })
        ));
    }
}
