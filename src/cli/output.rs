//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::codec::{Row, Value, to_hex};
use crate::engine::SchemaState;
use crate::schema::TableDefinition;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Summary of one table for `status` and `tables`.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    /// Table name.
    pub name: String,
    /// Number of declared columns, excluding `_id`.
    pub columns: usize,
    /// Number of rows.
    pub rows: usize,
}

/// Store-level summary for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Store file.
    pub path: String,
    /// Version recorded in the store.
    pub version: u32,
    /// Lifecycle state as seen by this session.
    pub state: SchemaState,
    /// Per-table summaries.
    pub tables: Vec<TableSummary>,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_size: Option<u64>,
}

/// Formats a status response.
#[must_use]
pub fn format_status(report: &StatusReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(report),
        OutputFormat::Json => format_json(report),
    }
}

fn format_status_text(report: &StatusReport) -> String {
    let mut output = String::new();
    output.push_str("Tablekit Status\n");
    output.push_str("===============\n\n");
    let _ = writeln!(output, "  Store:         {}", report.path);
    let _ = writeln!(output, "  Version:       v{}", report.version);
    let _ = writeln!(output, "  State:         {}", state_label(report.state));
    let _ = writeln!(output, "  Tables:        {}", report.tables.len());
    let _ = writeln!(
        output,
        "  Rows:          {}",
        report.tables.iter().map(|t| t.rows).sum::<usize>()
    );
    if let Some(size) = report.db_size {
        let _ = writeln!(output, "  DB size:       {size} bytes");
    }
    output
}

fn state_label(state: SchemaState) -> String {
    match state {
        SchemaState::Uncreated => "uncreated".to_string(),
        SchemaState::Created { version } => format!("created (v{version})"),
        SchemaState::Upgraded { from, to } => format!("upgraded (v{from} -> v{to})"),
    }
}

/// Formats a table list.
#[must_use]
pub fn format_tables(tables: &[TableSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_tables_text(tables),
        OutputFormat::Json => format_json(&tables),
    }
}

fn format_tables_text(tables: &[TableSummary]) -> String {
    if tables.is_empty() {
        return "No tables found.\n".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "{:<30} {:<8} Rows", "Table", "Columns");
    output.push_str(&"-".repeat(48));
    output.push('\n');
    for table in tables {
        let _ = writeln!(
            output,
            "{:<30} {:<8} {}",
            truncate(&table.name, 30),
            table.columns,
            table.rows
        );
    }
    output
}

/// Formats a table schema.
#[must_use]
pub fn format_schema(table: &TableDefinition, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_schema_text(table),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct SchemaView<'a> {
                #[serde(flatten)]
                table: &'a TableDefinition,
                create_statement: String,
            }
            format_json(&SchemaView {
                table,
                create_statement: table.create_statement(),
            })
        }
    }
}

fn format_schema_text(table: &TableDefinition) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Table: {}\n", table.name());
    let _ = writeln!(output, "  {:<24} {}", "_id", "INTEGER PRIMARY KEY");
    for column in table.columns() {
        let _ = writeln!(output, "  {:<24} {}", column.name, column.column_type);
    }
    let _ = writeln!(output, "\n{}", table.create_statement());
    output
}

/// Formats rows read from a table.
#[must_use]
pub fn format_rows(table: &TableDefinition, rows: &[Row], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_rows_text(table, rows),
        OutputFormat::Json => format_json(&rows),
    }
}

fn format_rows_text(table: &TableDefinition, rows: &[Row]) -> String {
    if rows.is_empty() {
        return "No rows found.\n".to_string();
    }

    let mut output = String::new();
    let header: Vec<_> = table
        .columns()
        .iter()
        .map(|c| format!("{:<20}", truncate(&c.name, 20)))
        .collect();
    let _ = writeln!(output, "{}", header.join(" ").trim_end());
    output.push_str(&"-".repeat(header.len() * 21));
    output.push('\n');

    for row in rows {
        let cells: Vec<_> = table
            .columns()
            .iter()
            .map(|c| format!("{:<20}", truncate(&display_value(row.get(&c.name)), 20)))
            .collect();
        let _ = writeln!(output, "{}", cells.join(" ").trim_end());
    }
    let _ = writeln!(output, "\n{} row(s)", rows.len());
    output
}

/// Formats the outcome of a delete.
#[must_use]
pub fn format_deleted(table: &str, deleted: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Deleted {deleted} row(s) from {table}.\n"),
        OutputFormat::Json => format_json(&serde_json::json!({
            "table": table,
            "deleted": deleted,
        })),
    }
}

/// Formats an error for output.
///
/// Text is the bare message; JSON wraps it with the error category.
#[must_use]
pub fn format_error(error: &crate::Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            let kind = match error {
                crate::Error::Storage(_) => "storage",
                crate::Error::Codec(_) => "codec",
                crate::Error::Config(_) => "config",
                crate::Error::Command(_) => "command",
            };
            format_json(&serde_json::json!({
                "error": kind,
                "message": error.to_string(),
            }))
        }
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::Integer(i)) => i.to_string(),
        Some(Value::Real(r)) => r.to_string(),
        Some(Value::Text(t)) => t.clone(),
        Some(Value::Blob(b)) => format!("x'{}'", to_hex(b)),
    }
}

fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
