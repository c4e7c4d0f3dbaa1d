//! Process-wide cache of derived table definitions.
//!
//! Column derivation runs once per table type (and name); later lookups
//! return the same shared [`TableDefinition`].

use crate::schema::column::derive_columns;
use crate::schema::table::{TableDefinition, TableSchema};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

type Key = (TypeId, String);

fn cache() -> &'static RwLock<HashMap<Key, Arc<TableDefinition>>> {
    static CACHE: OnceLock<RwLock<HashMap<Key, Arc<TableDefinition>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the memoized definition for `table`, deriving it on first use.
pub fn definition<S: TableSchema>(table: &S) -> Arc<TableDefinition> {
    let key = (TypeId::of::<S>(), table.name().to_string());

    if let Some(found) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Arc::clone(found);
    }

    let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(map.entry(key).or_insert_with(|| {
        let columns = derive_columns(table.name(), &table.markers());
        debug!(table = table.name(), columns = columns.len(), "derived table definition");
        Arc::new(TableDefinition::new(table.name(), columns))
    }))
}
