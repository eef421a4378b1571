//! Schema normalization: the one place where store column casing is reconciled.

use paylens_warehouse::{SqlColumn, Store, StoreTable};
use serde::Serialize;
use serde_json::Value;

use crate::PipelineError;

/// A table whose column names are trimmed and lowercased.
///
/// Lookups by name always go through the normalized names. If two raw
/// columns normalize to the same name, lookups resolve to the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    name: String,
    columns: Vec<SqlColumn>,
    rows: Vec<Vec<Value>>,
}

impl NormalizedTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[SqlColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column. `name` is normalized before the lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_column_name(name);
        self.columns.iter().position(|column| column.name == wanted)
    }

    pub fn column(&self, name: &str) -> Option<&SqlColumn> {
        self.column_index(name).map(|index| &self.columns[index])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Position of a column, or [`PipelineError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::missing_column(normalize_column_name(name)))
    }

    /// Same schema, different rows.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Canonical form of a column name.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Canonicalize the column names of a fetched table.
///
/// Rows are moved over untouched, so row count and order are preserved.
pub fn normalize(table: StoreTable) -> NormalizedTable {
    let columns = table
        .columns
        .into_iter()
        .map(|column| SqlColumn {
            name: normalize_column_name(&column.name),
            ..column
        })
        .collect();

    NormalizedTable {
        name: table.name,
        columns,
        rows: table.rows,
    }
}

/// Fetch `table` from the store and normalize it.
///
/// # Errors
/// [`PipelineError::StoreUnavailable`] if the query cannot run,
/// [`PipelineError::UnknownTable`] if the table does not exist. Single
/// attempt, no retries.
pub fn load_table(store: &Store, table: &str) -> Result<NormalizedTable, PipelineError> {
    let fetched = store.fetch_table(table)?;
    let normalized = normalize(fetched);
    tracing::debug!(
        table = normalized.name(),
        rows = normalized.len(),
        "table normalized"
    );
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paylens_warehouse::ColumnKind;
    use serde_json::json;

    fn column(name: &str, kind: ColumnKind) -> SqlColumn {
        SqlColumn {
            name: name.to_string(),
            r#type: String::from("INTEGER"),
            kind,
        }
    }

    fn raw_table() -> StoreTable {
        StoreTable {
            name: "agg_trans".to_string(),
            columns: vec![
                column(" Year", ColumnKind::Integer),
                column("STATE ", ColumnKind::Text),
                column("Transaction_Amount", ColumnKind::Float),
            ],
            rows: vec![
                vec![json!(2023), json!("goa"), json!(10.0)],
                vec![json!(2022), json!("assam"), json!(4.0)],
                vec![json!(2021), json!("bihar"), json!(1.5)],
            ],
        }
    }

    #[test]
    fn column_names_are_trimmed_and_lowercased() {
        let table = normalize(raw_table());
        let names = table
            .columns()
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["year", "state", "transaction_amount"]);
    }

    #[test]
    fn rows_are_preserved_in_order() {
        let raw = raw_table();
        let expected = raw.rows.clone();
        let table = normalize(raw);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows(), expected.as_slice());
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let table = normalize(raw_table());
        assert_eq!(table.column_index("YEAR"), Some(0));
        assert_eq!(table.column_index(" state"), Some(1));
        assert!(!table.has_column("district"));
        assert_eq!(
            table.require_column("District"),
            Err(PipelineError::MissingColumn {
                column: "district".to_string()
            })
        );
    }

    #[test]
    fn duplicate_normalized_names_resolve_to_first() {
        let table = normalize(StoreTable {
            name: "t".to_string(),
            columns: vec![column("State", ColumnKind::Text), column("state", ColumnKind::Text)],
            rows: vec![vec![json!("a"), json!("b")]],
        });
        assert_eq!(table.column_index("state"), Some(0));
    }
}
