use crate::types::{SourcedRecord, TableDescriptor};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Records bucketed by destination table, each bucket in discovery order
pub type GroupedData = HashMap<String, Vec<SourcedRecord>>;

/// Resolve the destination table from an explain descriptor
///
/// Returns an empty string when the descriptor is not a non-empty array of
/// table descriptors.
pub fn table_name(explain: &Value) -> String {
    Vec::<TableDescriptor>::deserialize(explain)
        .ok()
        .and_then(|descriptors| descriptors.into_iter().next())
        .map(|d| d.table)
        .unwrap_or_default()
}

/// Append each record to the bucket of its classified table
pub fn group_by_table(records: Vec<SourcedRecord>) -> GroupedData {
    let mut grouped = GroupedData::new();

    for sourced in records {
        let table = table_name(&sourced.record.explain);
        if table.is_empty() {
            warn!(
                file = %sourced.path.display(),
                "no destination table in explain_fq; record will not be inserted"
            );
        }
        grouped.entry(table).or_default().push(sourced);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Record;
    use serde_json::json;
    use std::path::PathBuf;

    fn sourced(file: &str, explain: Value) -> SourcedRecord {
        SourcedRecord {
            path: PathBuf::from(file),
            record: Record::new(explain, vec!["id".to_string()], vec![vec![json!(1)]]),
        }
    }

    #[test]
    fn test_table_name_first_descriptor() {
        let explain = json!([
            {"table": "Contracts", "alias": "c"},
            {"table": "Customers"}
        ]);
        assert_eq!(table_name(&explain), "Contracts");
    }

    #[test]
    fn test_table_name_fallbacks() {
        assert_eq!(table_name(&json!([])), "");
        assert_eq!(table_name(&Value::Null), "");
        assert_eq!(table_name(&json!({"table": "Customers"})), "");
        assert_eq!(table_name(&json!([{"table": 7}])), "");
        assert_eq!(table_name(&json!([{"schema": "crm"}])), "");
    }

    #[test]
    fn test_group_by_table_preserves_order() {
        let grouped = group_by_table(vec![
            sourced("1.json", json!([{"table": "Products"}])),
            sourced("2.json", json!([{"table": "Customers"}])),
            sourced("3.json", json!([{"table": "Products"}])),
            sourced("4.json", json!([])),
        ]);

        assert_eq!(grouped.len(), 3);
        let products: Vec<_> = grouped["Products"].iter().map(|r| r.path.clone()).collect();
        assert_eq!(products, vec![PathBuf::from("1.json"), PathBuf::from("3.json")]);
        assert_eq!(grouped["Customers"].len(), 1);
        assert_eq!(grouped[""].len(), 1);
    }
}
