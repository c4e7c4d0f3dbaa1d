//! SQL statement text for CRUD operations.
//!
//! Identifiers come from validated table definitions; values are always
//! bound as positional `?` parameters.

use crate::codec::{Row, Value};
use crate::engine::filter::{Filter, Query};
use crate::schema::TableDefinition;
use std::fmt::Write;

/// Statement text plus parameters in placeholder order.
pub(crate) type Statement<'a> = (String, Vec<&'a Value>);

fn push_where<'a>(sql: &mut String, params: &mut Vec<&'a Value>, filter: Option<&'a Filter>) {
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter.clause());
        params.extend(filter.params());
    }
}

pub(crate) fn insert<'a>(table: &TableDefinition, row: &'a Row) -> Statement<'a> {
    if row.is_empty() {
        return (format!("INSERT INTO {} DEFAULT VALUES", table.name()), Vec::new());
    }
    let (columns, params): (Vec<&str>, Vec<&Value>) = row.iter().unzip();
    let placeholders = vec!["?"; columns.len()].join(", ");
    (
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            table.name(),
            columns.join(", ")
        ),
        params,
    )
}

pub(crate) fn select<'a>(table: &TableDefinition, query: &'a Query) -> Statement<'a> {
    let mut sql = format!("SELECT * FROM {}", table.name());
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, query.filter_ref());
    if let Some(order) = query.order_clause() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }
    if let Some(limit) = query.limit_value() {
        let _ = write!(sql, " LIMIT {limit}");
    }
    (sql, params)
}

pub(crate) fn select_random(table: &TableDefinition) -> String {
    format!("SELECT * FROM {} ORDER BY RANDOM() LIMIT 1", table.name())
}

pub(crate) fn update<'a>(
    table: &TableDefinition,
    row: &'a Row,
    filter: Option<&'a Filter>,
) -> Statement<'a> {
    let assignments = row
        .iter()
        .map(|(column, _)| format!("{column}=?"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("UPDATE {} SET {assignments}", table.name());
    let mut params: Vec<&Value> = row.iter().map(|(_, v)| v).collect();
    push_where(&mut sql, &mut params, filter);
    (sql, params)
}

pub(crate) fn delete<'a>(table: &TableDefinition, filter: Option<&'a Filter>) -> Statement<'a> {
    let mut sql = format!("DELETE FROM {}", table.name());
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, filter);
    (sql, params)
}

pub(crate) fn count<'a>(table: &TableDefinition, filter: Option<&'a Filter>) -> Statement<'a> {
    let mut sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, filter);
    (sql, params)
}
