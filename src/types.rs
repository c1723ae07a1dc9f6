use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Insertion precedence used when no table order is configured.
///
/// Parents come before the tables holding foreign keys to them.
pub const DEFAULT_TABLE_ORDER: [&str; 5] = [
    "Customers",
    "Addresses",
    "ContractAccounts",
    "Contracts",
    "Products",
];

/// One decoded export file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque descriptor naming the destination table
    #[serde(rename = "explain_fq", default)]
    pub explain: Value,

    /// Column names, positionally aligned with every row in `rows`
    #[serde(rename = "keys", default, deserialize_with = "null_as_default")]
    pub column_names: Vec<String>,

    /// Row matrix
    #[serde(rename = "data", default, deserialize_with = "null_as_default")]
    pub rows: Vec<Vec<Value>>,
}

impl Record {
    pub fn new(explain: Value, column_names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Record {
            explain,
            column_names,
            rows,
        }
    }
}

/// A record tagged with the file it came from, for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRecord {
    pub path: PathBuf,
    pub record: Record,
}

/// First element of the explain descriptor; extra fields are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDescriptor {
    #[serde(default)]
    pub table: String,
}

/// Settings for one load run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    /// Directory scanned for `*.json` exports
    pub data_dir: PathBuf,

    /// Database connection string
    pub dsn: String,

    /// Tables in insertion order; names not listed are never inserted
    pub table_order: Vec<String>,

    /// Enforce foreign keys on the connection
    pub foreign_keys: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            data_dir: PathBuf::new(),
            dsn: String::new(),
            table_order: DEFAULT_TABLE_ORDER.iter().map(|t| t.to_string()).collect(),
            foreign_keys: true,
        }
    }
}

impl LoaderConfig {
    pub fn new(data_dir: impl Into<PathBuf>, dsn: impl Into<String>) -> Self {
        LoaderConfig {
            data_dir: data_dir.into(),
            dsn: dsn.into(),
            ..Default::default()
        }
    }

    pub fn with_table_order<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_order = tables.into_iter().map(Into::into).collect();
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_export() {
        let record: Record = serde_json::from_value(json!({
            "explain_fq": [{"table": "Customers", "schema": "crm"}],
            "keys": ["id", "name"],
            "data": [[1, "Alice"], [2, null]]
        }))
        .unwrap();

        assert_eq!(record.column_names, vec!["id", "name"]);
        assert_eq!(record.rows.len(), 2);
        assert_eq!(record.rows[1][1], Value::Null);
        assert!(record.explain.is_array());
    }

    #[test]
    fn test_record_missing_and_null_fields() {
        let record: Record = serde_json::from_value(json!({
            "keys": null
        }))
        .unwrap();

        assert_eq!(record.explain, Value::Null);
        assert!(record.column_names.is_empty());
        assert!(record.rows.is_empty());
    }

    #[test]
    fn test_config_camel_case_keys() {
        let config: LoaderConfig = serde_json::from_value(json!({
            "dataDir": "/srv/exports",
            "dsn": "sqlite:///tmp/crm.db"
        }))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/exports"));
        assert_eq!(config.dsn, "sqlite:///tmp/crm.db");
        assert_eq!(config.table_order, DEFAULT_TABLE_ORDER.to_vec());
        assert!(config.foreign_keys);
    }
}
