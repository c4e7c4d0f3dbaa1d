//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default store file, relative to the current directory.
pub const DEFAULT_DB_PATH: &str = "store.db";

/// Tablekit: inspect and maintain tablekit stores.
///
/// Reads the tables of an existing store file and prints their schema or
/// contents. Nothing is created and no upgrades run.
#[derive(Parser, Debug)]
#[command(name = "tablekit")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the store file.
    ///
    /// Defaults to `store.db` in the current directory.
    #[arg(short, long, env = "TABLEKIT_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show store version and per-table row counts.
    Status,

    /// List the tables in the store.
    #[command(alias = "ls")]
    Tables,

    /// Show a table's columns and its CREATE statement.
    Schema {
        /// Table name.
        table: String,
    },

    /// Print the rows of a table.
    Dump {
        /// Table name.
        table: String,

        /// Only rows where a column equals a value (`column=value`).
        #[arg(short = 'w', long = "where", value_name = "COLUMN=VALUE")]
        filter: Option<String>,

        /// Column to sort by.
        #[arg(short, long)]
        order_by: Option<String>,

        /// Sort descending.
        #[arg(long, requires = "order_by")]
        desc: bool,

        /// Maximum number of rows.
        #[arg(short = 'n', long)]
        limit: Option<u32>,
    },

    /// Print one row chosen at random.
    Random {
        /// Table name.
        table: String,
    },

    /// Delete rows from a table.
    #[command(alias = "rm")]
    Delete {
        /// Table name.
        table: String,

        /// Only rows where a column equals a value (`column=value`).
        #[arg(short = 'w', long = "where", value_name = "COLUMN=VALUE", conflicts_with = "all")]
        filter: Option<String>,

        /// Delete every row.
        #[arg(long)]
        all: bool,

        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

impl Cli {
    /// Returns the store path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        let cli = Cli {
            db_path: None,
            verbose: false,
            format: "text".to_string(),
            command: Commands::Status,
        };
        assert_eq!(cli.get_db_path(), PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn test_dump_arguments() {
        let cli = Cli::try_parse_from([
            "tablekit", "dump", "CarTable", "--where", "name=Jim", "--order-by", "colour",
            "--desc", "-n", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Dump {
                table,
                filter,
                order_by,
                desc,
                limit,
            } => {
                assert_eq!(table, "CarTable");
                assert_eq!(filter.as_deref(), Some("name=Jim"));
                assert_eq!(order_by.as_deref(), Some("colour"));
                assert!(desc);
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_desc_requires_order_by() {
        assert!(Cli::try_parse_from(["tablekit", "dump", "T", "--desc"]).is_err());
    }

    #[test]
    fn test_delete_where_conflicts_with_all() {
        let parsed = Cli::try_parse_from(["tablekit", "delete", "T", "--where", "a=1", "--all"]);
        assert!(parsed.is_err());
    }
}
