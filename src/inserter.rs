//! Ordered insertion of grouped records
//!
//! Tables are visited in the configured order so parents land before the
//! rows that reference them. Every row runs as its own statement execution;
//! a failed row is logged and the next one is attempted.

use crate::classify::GroupedData;
use crate::error::{LoadError, Result};
use crate::sql::{build_insert_sql, to_sql_value};
use crate::types::Record;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Outcome counters for one destination table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    /// Records routed to this table
    pub records: usize,
    /// Records abandoned before any row ran (validation or prepare failure)
    pub records_failed: usize,
    /// Rows attempted, successful or not
    pub rows_processed: usize,
    pub rows_inserted: usize,
    pub rows_failed: usize,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        TableReport {
            table: table.into(),
            ..Default::default()
        }
    }
}

/// Summary of a full load run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub files_found: usize,
    pub files_skipped: usize,
    /// Records whose explain descriptor yielded no table
    pub unrouted_records: usize,
    /// Records routed to a table outside the table order
    pub unlisted_records: usize,
    /// One entry per listed table that received records, in insertion order
    pub tables: Vec<TableReport>,
}

impl LoadReport {
    pub fn rows_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }

    pub fn rows_failed(&self) -> usize {
        self.tables.iter().map(|t| t.rows_failed).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }
}

/// Open the database named by `dsn`
///
/// Accepts a SQLite path, `:memory:`, or a path prefixed with `sqlite://`
/// or `sqlite:`.
pub fn open_database(dsn: &str, foreign_keys: bool) -> Result<Connection> {
    let target = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);
    if target.is_empty() {
        return Err(LoadError::Config("empty database connection string".to_string()));
    }

    let conn = Connection::open(target)?;
    conn.pragma_update(None, "foreign_keys", foreign_keys)?;
    Ok(conn)
}

/// Inserts grouped records following a fixed table order
pub struct OrderedInserter<'a> {
    conn: &'a Connection,
    table_order: &'a [String],
}

impl<'a> OrderedInserter<'a> {
    pub fn new(conn: &'a Connection, table_order: &'a [String]) -> Self {
        OrderedInserter { conn, table_order }
    }

    /// Insert every listed table's records, in table order
    ///
    /// Buckets for tables outside the order (including the empty name) are
    /// left untouched. A table listed more than once is visited only at its
    /// first position.
    pub fn insert_all(&self, grouped: &GroupedData) -> Vec<TableReport> {
        let mut reports = Vec::new();
        let mut visited = HashSet::new();

        for table in self.table_order {
            if !visited.insert(table.as_str()) {
                warn!(table = %table, "table listed twice in table order; ignoring repeat");
                continue;
            }
            let Some(records) = grouped.get(table) else {
                continue;
            };

            let mut report = TableReport::new(table.clone());
            for sourced in records {
                report.records += 1;
                if let Err(e) = self.insert_record(table, &sourced.record, &mut report) {
                    error!(
                        table = %table,
                        file = %sourced.path.display(),
                        "error preparing insert: {}",
                        e
                    );
                    report.records_failed += 1;
                }
            }

            info!(
                table = %table,
                records = report.records,
                rows_processed = report.rows_processed,
                rows_inserted = report.rows_inserted,
                rows_failed = report.rows_failed,
                "table complete"
            );
            reports.push(report);
        }

        reports
    }

    /// Insert all rows of one record into `table`
    ///
    /// Errors only when no row could be attempted. Row failures are logged
    /// and counted in `report`.
    pub fn insert_record(&self, table: &str, record: &Record, report: &mut TableReport) -> Result<()> {
        if !self.table_order.iter().any(|t| t == table) {
            return Err(LoadError::UnknownTable(table.to_string()));
        }

        let sql = build_insert_sql(table, &record.column_names)?;
        let mut stmt = self.conn.prepare(&sql)?;

        for (index, row) in record.rows.iter().enumerate() {
            report.rows_processed += 1;
            match stmt.execute(params_from_iter(row.iter().map(to_sql_value))) {
                Ok(_) => {
                    info!(table = %table, index, "inserted row");
                    report.rows_inserted += 1;
                }
                Err(e) => {
                    error!(table = %table, index, "error inserting row: {}", e);
                    report.rows_failed += 1;
                }
            }
        }

        info!(
            table = %table,
            rows_processed = record.rows.len(),
            "finished inserting record"
        );
        Ok(())
    }
}

/// Count records sitting in buckets the inserter never visits
///
/// Returns `(unrouted, unlisted)`: records with no table name, and records
/// whose table is not in `table_order`.
pub fn count_skipped(grouped: &GroupedData, table_order: &[String]) -> (usize, usize) {
    let mut unrouted = 0;
    let mut unlisted = 0;

    let mut names: Vec<&String> = grouped.keys().collect();
    names.sort();
    for name in names {
        let count = grouped[name].len();
        if name.is_empty() {
            unrouted += count;
        } else if !table_order.contains(name) {
            warn!(table = %name, records = count, "table not in table order; records will not be inserted");
            unlisted += count;
        }
    }

    (unrouted, unlisted)
}
