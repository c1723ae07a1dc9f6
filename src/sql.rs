//! INSERT construction and value binding
//!
//! Table and column names end up in the SQL text, so both are checked
//! against a strict identifier pattern before use. Row values are always
//! bound as parameters.

use crate::error::{LoadError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
});

/// Check that `name` is safe to interpolate as an identifier
pub fn validate_identifier(name: &str) -> Result<&str> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(name)
    } else {
        Err(LoadError::InvalidIdentifier(name.to_string()))
    }
}

/// Build `INSERT INTO "table" ("a", "b") VALUES (?1, ?2)` for a record
///
/// With no columns the statement is `INSERT INTO "table" DEFAULT VALUES`,
/// which only accepts empty rows.
pub fn build_insert_sql(table: &str, columns: &[String]) -> Result<String> {
    validate_identifier(table)?;
    if columns.is_empty() {
        return Ok(format!("INSERT INTO \"{}\" DEFAULT VALUES", table));
    }

    let mut column_list = Vec::with_capacity(columns.len());
    let mut placeholders = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        column_list.push(format!("\"{}\"", validate_identifier(column)?));
        placeholders.push(format!("?{}", i + 1));
    }

    Ok(format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        column_list.join(", "),
        placeholders.join(", ")
    ))
}

/// Convert a loosely-typed JSON scalar into a bindable SQL value
///
/// Nested arrays and objects are stored as their compact JSON text, as are
/// integers too large for a signed 64-bit column.
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if n.is_u64() {
                SqlValue::Text(n.to_string())
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_insert_sql() {
        let sql = build_insert_sql("Customers", &cols(&["id", "name"])).unwrap();
        assert_eq!(sql, r#"INSERT INTO "Customers" ("id", "name") VALUES (?1, ?2)"#);
    }

    #[test]
    fn test_rejects_injection_in_table() {
        let err = build_insert_sql("Customers; DROP TABLE Customers", &cols(&["id"])).unwrap_err();
        assert!(matches!(err, LoadError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_rejects_bad_column() {
        let err = build_insert_sql("Customers", &cols(&["id", "name\" TEXT"])).unwrap_err();
        assert!(matches!(err, LoadError::InvalidIdentifier(ref c) if c == "name\" TEXT"));
    }

    #[test]
    fn test_empty_columns_use_default_values() {
        let sql = build_insert_sql("Customers", &[]).unwrap();
        assert_eq!(sql, r#"INSERT INTO "Customers" DEFAULT VALUES"#);
    }

    #[test]
    fn test_identifier_pattern() {
        assert!(validate_identifier("ContractAccounts").is_ok());
        assert!(validate_identifier("_tmp_1").is_ok());
        assert!(validate_identifier("1st").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a-b").is_err());
    }

    #[test]
    fn test_to_sql_value() {
        assert_eq!(to_sql_value(&json!(null)), SqlValue::Null);
        assert_eq!(to_sql_value(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql_value(&json!(42)), SqlValue::Integer(42));
        assert_eq!(to_sql_value(&json!(2.5)), SqlValue::Real(2.5));
        assert_eq!(
            to_sql_value(&json!(18446744073709551615u64)),
            SqlValue::Text("18446744073709551615".into())
        );
        assert_eq!(to_sql_value(&json!(-7)), SqlValue::Integer(-7));
        assert_eq!(to_sql_value(&json!("Alice")), SqlValue::Text("Alice".into()));
        assert_eq!(
            to_sql_value(&json!({"street": "Main"})),
            SqlValue::Text(r#"{"street":"Main"}"#.into())
        );
    }
}
