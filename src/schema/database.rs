//! Database definitions: store name, version, tables, and upgrade source.

use crate::error::ConfigError;
use crate::schema::column::is_identifier;
use crate::schema::table::{TableDefinition, TableSchema};
use std::fmt;
use std::sync::Arc;

/// File suffix appended to the database name.
pub const DB_SUFFIX: &str = ".db";

/// Supplies raw upgrade statements for a stored version.
///
/// Called with the version the store is upgrading *from*. The returned
/// statements are executed verbatim and in order. A common pattern is a
/// `match` on the old version whose arms fall through to later upgrades so
/// that stores skipping versions still receive every step.
pub trait UpgradeSource: Send + Sync {
    /// Statements that bring a store at `old_version` up to date.
    fn on_upgrade(&self, old_version: u32) -> Vec<String>;
}

impl<F> UpgradeSource for F
where
    F: Fn(u32) -> Vec<String> + Send + Sync,
{
    fn on_upgrade(&self, old_version: u32) -> Vec<String> {
        self(old_version)
    }
}

/// Upgrade source that has nothing to run.
struct NoUpgrades;

impl UpgradeSource for NoUpgrades {
    fn on_upgrade(&self, _old_version: u32) -> Vec<String> {
        Vec::new()
    }
}

/// Name, version, and tables of one physical store.
#[derive(Clone)]
pub struct DatabaseDefinition {
    name: String,
    version: u32,
    tables: Vec<Arc<TableDefinition>>,
    upgrades: Arc<dyn UpgradeSource>,
}

impl DatabaseDefinition {
    /// Starts building a definition.
    pub fn builder(name: impl Into<String>, version: u32) -> DatabaseBuilder {
        DatabaseBuilder {
            name: name.into(),
            version,
            tables: Vec::new(),
            upgrades: Arc::new(NoUpgrades),
        }
    }

    /// Database name, without suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the store (`name + ".db"`).
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}{DB_SUFFIX}", self.name)
    }

    /// Declared schema version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Registered tables, in registration order.
    #[must_use]
    pub fn tables(&self) -> &[Arc<TableDefinition>] {
        &self.tables
    }

    /// Looks up a registered table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Arc<TableDefinition>> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Upgrade statements for a store at `old_version`.
    #[must_use]
    pub fn upgrade_statements(&self, old_version: u32) -> Vec<String> {
        self.upgrades.on_upgrade(old_version)
    }
}

impl fmt::Debug for DatabaseDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseDefinition")
            .field("name", &self.name)
            .field("version", &self.version)
            .field(
                "tables",
                &self.tables.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Builder for [`DatabaseDefinition`].
pub struct DatabaseBuilder {
    name: String,
    version: u32,
    tables: Vec<Arc<TableDefinition>>,
    upgrades: Arc<dyn UpgradeSource>,
}

impl DatabaseBuilder {
    /// Registers a table type.
    #[must_use]
    pub fn table<S: TableSchema>(mut self, table: &S) -> Self {
        self.tables.push(table.definition());
        self
    }

    /// Registers an already-derived table definition.
    #[must_use]
    pub fn table_definition(mut self, table: Arc<TableDefinition>) -> Self {
        self.tables.push(table);
        self
    }

    /// Sets the upgrade source.
    #[must_use]
    pub fn upgrade(mut self, upgrades: impl UpgradeSource + 'static) -> Self {
        self.upgrades = Arc::new(upgrades);
        self
    }

    /// Validates and builds the definition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the version is 0, the database or a table
    /// name is not a plain identifier, or two tables share a name.
    pub fn build(self) -> Result<DatabaseDefinition, ConfigError> {
        if self.version < 1 {
            return Err(ConfigError::InvalidVersion(self.version));
        }
        if !is_identifier(&self.name) {
            return Err(ConfigError::InvalidIdentifier(self.name));
        }
        for (i, table) in self.tables.iter().enumerate() {
            if !is_identifier(table.name()) {
                return Err(ConfigError::InvalidIdentifier(table.name().to_string()));
            }
            if self.tables[..i].iter().any(|t| t.name() == table.name()) {
                return Err(ConfigError::DuplicateTable(table.name().to_string()));
            }
        }

        Ok(self.build_unchecked())
    }

    /// Builds without validation, for definitions read back from a store.
    pub(crate) fn build_unchecked(self) -> DatabaseDefinition {
        DatabaseDefinition {
            name: self.name,
            version: self.version,
            tables: self.tables,
            upgrades: self.upgrades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::derive_columns;
    use crate::schema::ColumnMarker;

    fn table(name: &str) -> Arc<TableDefinition> {
        Arc::new(TableDefinition::new(
            name,
            derive_columns(name, &[ColumnMarker::new("value", "TEXT")]),
        ))
    }

    #[test]
    fn test_build_valid() {
        let db = DatabaseDefinition::builder("CarsDatabase", 1)
            .table_definition(table("A"))
            .table_definition(table("B"))
            .build()
            .unwrap();
        assert_eq!(db.file_name(), "CarsDatabase.db");
        assert_eq!(db.version(), 1);
        assert_eq!(db.tables().len(), 2);
        assert!(db.table("B").is_some());
        assert!(db.upgrade_statements(1).is_empty());
    }

    #[test]
    fn test_version_zero_rejected() {
        let err = DatabaseDefinition::builder("Db", 0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidVersion(0));
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let err = DatabaseDefinition::builder("Db", 1)
            .table_definition(table("Same"))
            .table_definition(table("Same"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateTable("Same".to_string()));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let err = DatabaseDefinition::builder("my db", 1).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_closure_upgrade_source() {
        let db = DatabaseDefinition::builder("Db", 3)
            .upgrade(|old: u32| {
                let mut sql = Vec::new();
                if old < 2 {
                    sql.push("ALTER TABLE A ADD COLUMN b TEXT".to_string());
                }
                if old < 3 {
                    sql.push("ALTER TABLE A ADD COLUMN c TEXT".to_string());
                }
                sql
            })
            .build()
            .unwrap();
        assert_eq!(db.upgrade_statements(1).len(), 2);
        assert_eq!(db.upgrade_statements(2).len(), 1);
    }
}
