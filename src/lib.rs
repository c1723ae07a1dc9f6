//! # Export Loader - JSON exports into a relational database
//!
//! Loads a directory of JSON export files into SQLite. Each file names its
//! destination table in `explain_fq`, lists its columns in `keys` and carries
//! its rows in `data`. Tables are filled in a fixed order so that rows
//! referenced by foreign keys exist before the rows that point at them.
//!
//! ## Pipeline
//!
//! - **loader**: discover `*.json` files and decode them into [`Record`]s
//! - **classify**: resolve each record's table and group records by table
//! - **inserter**: insert grouped records table by table, row by row
//!
//! ## Quick Start
//!
//! ```no_run
//! use export_loader::{load_directory, LoaderConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = LoaderConfig::new("./exports", "sqlite://crm.db");
//! let report = load_directory(&config)?;
//! println!("{} rows inserted", report.rows_inserted());
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use tracing::info;

pub mod classify;
pub mod error;
pub mod inserter;
pub mod loader;
pub mod sql;
pub mod types;

// Re-export commonly used types for convenience
pub use classify::{group_by_table, table_name, GroupedData};
pub use error::LoadError;
pub use inserter::{open_database, LoadReport, OrderedInserter, TableReport};
pub use loader::{discover_files, load_records, read_record};
pub use types::{LoaderConfig, Record, SourcedRecord, TableDescriptor, DEFAULT_TABLE_ORDER};

/// Main entry point: load every export in `config.data_dir` into `config.dsn`
///
/// Only setup failures (opening the database, listing the directory) are
/// returned as errors. File, record and row failures are logged and
/// reflected in the returned report.
pub fn load_directory(config: &LoaderConfig) -> Result<LoadReport> {
    let conn = open_database(&config.dsn, config.foreign_keys)
        .with_context(|| format!("Failed to open database {}", config.dsn))?;

    let files = discover_files(&config.data_dir).with_context(|| {
        format!("Failed to list JSON files in {}", config.data_dir.display())
    })?;
    info!(dir = %config.data_dir.display(), files = files.len(), "discovered export files");

    let (records, files_skipped) = load_records(&files);
    let grouped = group_by_table(records);
    let (unrouted_records, unlisted_records) =
        inserter::count_skipped(&grouped, &config.table_order);

    let tables = OrderedInserter::new(&conn, &config.table_order).insert_all(&grouped);

    Ok(LoadReport {
        files_found: files.len(),
        files_skipped,
        unrouted_records,
        unlisted_records,
        tables,
    })
}
