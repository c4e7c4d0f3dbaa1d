//! CLI command implementations.
//!
//! Every command opens the store through [`inspect::open`], so tables are
//! discovered from the file rather than compiled in.

use crate::cli::output::{
    OutputFormat, StatusReport, TableSummary, format_deleted, format_rows, format_schema,
    format_status, format_tables,
};
use crate::cli::parser::{Cli, Commands};
use crate::codec::Value;
use crate::engine::{Direction, Filter, Query, Store};
use crate::error::{CommandError, Result, StorageError};
use crate::inspect::{self, DynamicTable};
use crate::schema::{ColumnType, TableDefinition, TableSchema};
use std::path::Path;
use std::sync::Arc;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the command fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Status => cmd_status(&db_path, format),
        Commands::Tables => cmd_tables(&db_path, format),
        Commands::Schema { table } => cmd_schema(&db_path, table, format),
        Commands::Dump {
            table,
            filter,
            order_by,
            desc,
            limit,
        } => cmd_dump(
            &db_path,
            table,
            filter.as_deref(),
            order_by.as_deref(),
            *desc,
            *limit,
            format,
        ),
        Commands::Random { table } => cmd_random(&db_path, table, format),
        Commands::Delete {
            table,
            filter,
            all,
            yes,
        } => cmd_delete(&db_path, table, filter.as_deref(), *all, *yes, format),
    }
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = inspect::open(db_path)?;
    let report = StatusReport {
        path: db_path.display().to_string(),
        version: store.stored_version()?,
        state: store.schema_state(),
        tables: summarize(&store)?,
        db_size: std::fs::metadata(db_path).ok().map(|m| m.len()),
    };
    Ok(format_status(&report, format))
}

fn cmd_tables(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = inspect::open(db_path)?;
    Ok(format_tables(&summarize(&store)?, format))
}

fn cmd_schema(db_path: &Path, table: &str, format: OutputFormat) -> Result<String> {
    let store = inspect::open(db_path)?;
    let table = inspect::table(&store, table)?;
    Ok(format_schema(&table.definition(), format))
}

fn cmd_dump(
    db_path: &Path,
    table: &str,
    filter: Option<&str>,
    order_by: Option<&str>,
    desc: bool,
    limit: Option<u32>,
    format: OutputFormat,
) -> Result<String> {
    let store = inspect::open(db_path)?;
    let table = inspect::table(&store, table)?;
    let def = table.definition();

    let mut query = Query::new();
    if let Some(filter) = filter {
        query = query.filter(parse_filter(&def, filter)?);
    }
    if let Some(column) = order_by {
        let direction = if desc { Direction::Desc } else { Direction::Asc };
        query = query.order_by(column, direction);
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let rows = store.query(&table, &query)?;
    Ok(format_rows(&def, &rows, format))
}

fn cmd_random(db_path: &Path, table: &str, format: OutputFormat) -> Result<String> {
    let store = inspect::open(db_path)?;
    let table = inspect::table(&store, table)?;
    let rows: Vec<_> = store.query_random(&table)?.into_iter().collect();
    Ok(format_rows(&table.definition(), &rows, format))
}

fn cmd_delete(
    db_path: &Path,
    table: &str,
    filter: Option<&str>,
    all: bool,
    yes: bool,
    format: OutputFormat,
) -> Result<String> {
    if filter.is_none() && !all {
        return Err(CommandError::InvalidArgument(
            "Specify --where COLUMN=VALUE or --all.".to_string(),
        )
        .into());
    }
    if !yes {
        return Err(CommandError::ExecutionFailed(
            "Use --yes to confirm delete. Deleted rows cannot be recovered.".to_string(),
        )
        .into());
    }

    let store = inspect::open(db_path)?;
    let dynamic = inspect::table(&store, table)?;
    let deleted = match filter {
        Some(filter) => {
            let filter = parse_filter(&dynamic.definition(), filter)?;
            store.delete(&dynamic, Some(&filter))?
        }
        None => store.delete_all(&dynamic)?,
    };
    Ok(format_deleted(table, deleted, format))
}

fn summarize(store: &Store) -> Result<Vec<TableSummary>> {
    store
        .definition()
        .tables()
        .iter()
        .map(|def| {
            let table = DynamicTable::new(Arc::clone(def));
            Ok(TableSummary {
                name: def.name().to_string(),
                columns: def.columns().len(),
                rows: store.count(&table, None)?,
            })
        })
        .collect()
}

/// Parses `column=value` into an equality filter.
///
/// The value is converted to the column's declared type where it parses;
/// otherwise it is compared as text. A value of `null` (any case) matches
/// rows where the column `IS NULL`.
fn parse_filter(table: &TableDefinition, input: &str) -> Result<Filter> {
    let (column, raw) = input.split_once('=').ok_or_else(|| {
        CommandError::InvalidArgument(format!("expected COLUMN=VALUE, got '{input}'"))
    })?;
    let column = column.trim();
    if column.is_empty() {
        return Err(CommandError::InvalidArgument(format!("missing column in '{input}'")).into());
    }

    if raw.trim().eq_ignore_ascii_case("null") {
        if !table.has_column(column) {
            return Err(StorageError::UnknownColumn {
                table: table.name().to_string(),
                column: column.to_string(),
            }
            .into());
        }
        return Ok(Filter::raw(format!("{column} IS NULL"), Vec::new()));
    }

    let value = match table.column(column).map(|c| &c.column_type) {
        Some(ColumnType::Integer) => raw
            .parse::<i64>()
            .map_or_else(|_| Value::from(raw), Value::from),
        Some(ColumnType::Real) => raw
            .parse::<f64>()
            .map_or_else(|_| Value::from(raw), Value::from),
        _ => Value::from(raw),
    };
    Ok(Filter::equals(column, value))
}
