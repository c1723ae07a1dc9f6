//! export-load: Load a directory of JSON exports into a database
//!
//! Usage:
//!   # Settings from flags
//!   export-load --data-dir ./exports --dsn sqlite://crm.db
//!
//!   # Settings from a JSON file ({"dataDir": ..., "dsn": ..., "tableOrder": [...]})
//!   export-load --config loader.json
//!
//!   # Flags override the file; write the run report as JSON
//!   export-load --config loader.json --dsn other.db --report-json report.json

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use export_loader::{load_directory, LoadReport, LoaderConfig};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "export-load")]
#[command(about = "Load JSON export files into a relational database", long_about = None)]
struct Args {
    /// JSON config file with dataDir, dsn, tableOrder and foreignKeys
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing the *.json exports
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Database connection string (SQLite path, optionally sqlite://)
    #[arg(long)]
    dsn: Option<String>,

    /// Comma-separated tables in insertion order
    #[arg(long, value_delimiter = ',')]
    table_order: Option<Vec<String>>,

    /// Don't enforce foreign keys on the connection
    #[arg(long)]
    no_foreign_keys: bool,

    /// Write the run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let config = build_config(&args)?;
    let report = match load_directory(&config) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("fatal: {:#}", e);
            return Err(e);
        }
    };

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    print_summary(&report)?;
    Ok(())
}

fn init_tracing(args: &Args) {
    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Merge the optional config file with command-line overrides
fn build_config(args: &Args) -> Result<LoaderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<LoaderConfig>(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => LoaderConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dsn) = &args.dsn {
        config.dsn = dsn.clone();
    }
    if let Some(order) = &args.table_order {
        config.table_order = order
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if args.no_foreign_keys {
        config.foreign_keys = false;
    }

    if config.data_dir.as_os_str().is_empty() {
        bail!("no data directory given (use --data-dir or dataDir in the config file)");
    }
    if config.dsn.is_empty() {
        bail!("no database given (use --dsn or dsn in the config file)");
    }
    let mut seen = HashSet::new();
    for table in &config.table_order {
        if !seen.insert(table.as_str()) {
            bail!("table {:?} appears more than once in the table order", table);
        }
    }

    Ok(config)
}

fn print_summary(report: &LoadReport) -> Result<()> {
    let sep = "=".repeat(60);
    let mut stderr = io::stderr();
    writeln!(stderr, "\n{}\nSUMMARY\n{}", sep, sep)?;
    writeln!(
        stderr,
        "Files:    {} found, {} skipped",
        report.files_found, report.files_skipped
    )?;
    for table in &report.tables {
        writeln!(
            stderr,
            "{:<18} {} processed, {} inserted, {} failed ({} of {} records abandoned)",
            table.table,
            table.rows_processed,
            table.rows_inserted,
            table.rows_failed,
            table.records_failed,
            table.records
        )?;
    }
    if report.unrouted_records > 0 || report.unlisted_records > 0 {
        writeln!(
            stderr,
            "Not inserted: {} without a table, {} for unlisted tables",
            report.unrouted_records, report.unlisted_records
        )?;
    }
    writeln!(
        stderr,
        "Total:    {} inserted, {} failed",
        report.rows_inserted(),
        report.rows_failed()
    )?;
    writeln!(stderr, "{}", sep)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.json");
        std::fs::write(
            &path,
            r#"{"dataDir": "/srv/exports", "dsn": "file.db", "tableOrder": ["Customers"]}"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "export-load",
            "--config",
            path.to_str().unwrap(),
            "--dsn",
            "other.db",
            "--table-order",
            "Customers, Contracts",
        ]);
        let config = build_config(&args).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/exports"));
        assert_eq!(config.dsn, "other.db");
        assert_eq!(config.table_order, vec!["Customers", "Contracts"]);
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_repeated_table_order_is_rejected() {
        let args = Args::parse_from([
            "export-load",
            "--data-dir",
            "./exports",
            "--dsn",
            "crm.db",
            "--table-order",
            "Customers,Contracts,Customers",
        ]);
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("Customers"));
    }

    #[test]
    fn test_missing_dsn_is_rejected() {
        let args = Args::parse_from(["export-load", "--data-dir", "./exports"]);
        assert!(build_config(&args).is_err());
    }
}
