//! # Paylens Warehouse
//!
//! Read-only access to the DuckDB store that holds the pre-aggregated
//! payment, insurance and user-registration tables.
//!
//! ## Overview
//!
//! The store is opened once per process through [`Store::open`] and passed
//! explicitly to whoever needs it. It never writes: connections are opened
//! with `access_mode = READ_ONLY` and every statement issued here is a
//! `SELECT`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paylens_warehouse::{Store, StoreConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open(StoreConfig::default())?;
//!     let table = store.fetch_table("agg_trans")?;
//!     println!("{} rows, {} columns", table.rows.len(), table.columns.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Metrics |
//! |-------|---------|
//! | `agg_trans`, `map_trans`, `top_trans` | `transaction_count`, `transaction_amount` |
//! | `agg_insur`, `map_insur`, `top_insur` | `insurance_count`, `insurance_amount` |
//! | `agg_users`, `map_user` | `registered_users`, `app_opens` |
//! | `top_users` | `registered_users` |

pub mod overview;
pub mod store;

use std::env;
use std::path::{Path, PathBuf};

use ::duckdb::types::{Type as DuckType, Value as DuckValue};
use ::duckdb::Connection;
use ::duckdb::ToSql;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

pub use overview::StateTotals;
pub use store::AccessMode;

/// Errors that can occur while reading the store.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` error while running a query.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// The store could not be opened or probed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The table does not exist in the store.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// The table exists but lacks a requested column.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
}

/// Configuration for locating the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for paylens data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let home = resolve_paylens_home();
        let db_path = env::var_os("PAYLENS_DB")
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| home.join("pulse.duckdb"));
        Self { home, db_path }
    }
}

impl StoreConfig {
    /// Default configuration with an explicit database file.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// Coarse type class of a store column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Boolean,
    Other,
}

impl ColumnKind {
    /// Whether values of this kind take part in numeric aggregation.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    fn from_duck_type(data_type: &DuckType) -> Self {
        match data_type {
            DuckType::TinyInt
            | DuckType::SmallInt
            | DuckType::Int
            | DuckType::BigInt
            | DuckType::HugeInt
            | DuckType::UTinyInt
            | DuckType::USmallInt
            | DuckType::UInt
            | DuckType::UBigInt => Self::Integer,
            DuckType::Float | DuckType::Double | DuckType::Decimal => Self::Float,
            DuckType::Text => Self::Text,
            DuckType::Boolean => Self::Boolean,
            _ => Self::Other,
        }
    }
}

/// Column metadata for a fetched table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlColumn {
    /// Column name exactly as the store reports it.
    pub name: String,
    /// Store data type.
    #[serde(rename = "type")]
    pub r#type: String,
    /// Type class used by the aggregation layer.
    pub kind: ColumnKind,
}

/// Full contents of one store table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreTable {
    /// Table name as requested.
    pub name: String,
    /// Column definitions, in store order.
    pub columns: Vec<SqlColumn>,
    /// Row data as JSON values, in the order the store returned them.
    pub rows: Vec<Vec<Value>>,
}

/// Handle on the read-only store.
///
/// Created once at process start and held for the process lifetime.
pub struct Store {
    config: StoreConfig,
    connection: Connection,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("db_path", &self.config.db_path)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open the store with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(StoreConfig::default())
    }

    /// Open the store described by `config`.
    ///
    /// Fails with [`WarehouseError::StoreUnavailable`] when the database file
    /// is missing or the connection cannot be established.
    pub fn open(config: StoreConfig) -> Result<Self, WarehouseError> {
        if !config.db_path.is_file() {
            return Err(WarehouseError::StoreUnavailable(format!(
                "database file '{}' does not exist",
                config.db_path.display()
            )));
        }

        let connection = store::open_connection(config.db_path.as_path(), AccessMode::ReadOnly)
            .map_err(|error| {
                WarehouseError::StoreUnavailable(format!(
                    "cannot open '{}': {error}",
                    config.db_path.display()
                ))
            })?;

        tracing::info!(db_path = %config.db_path.display(), "store opened read-only");
        Ok(Self { config, connection })
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.config.db_path.as_path()
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Names of all base tables in the store, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, WarehouseError> {
        let mut statement = self.connection.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' ORDER BY table_name",
        )?;
        let names = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Fetch every row of `table`.
    ///
    /// Column names are returned exactly as the store defines them; casing is
    /// reconciled by the caller.
    ///
    /// # Errors
    /// [`WarehouseError::UnknownTable`] when the name is not a plain
    /// identifier or no such table exists; [`WarehouseError::DuckDb`] when the
    /// query fails.
    pub fn fetch_table(&self, table: &str) -> Result<StoreTable, WarehouseError> {
        let table_name = self.resolve_table(table)?;
        let sql = format!("SELECT * FROM {}", quote_identifier(&table_name));

        let columns = self.describe_columns(&table_name)?;
        let column_count = columns.len();

        let mut statement = self.connection.prepare(sql.as_str())?;
        let mut cursor = statement.query([] as [&dyn ToSql; 0])?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next()? {
            rows.push(read_row(row, column_count)?);
        }

        tracing::debug!(
            table = %table_name,
            rows = rows.len(),
            columns = columns.len(),
            "table fetched"
        );

        Ok(StoreTable {
            name: table.to_string(),
            columns,
            rows,
        })
    }

    /// Column names and types of `table_name`, read from a `LIMIT 0` query so
    /// no rows are scanned.
    fn describe_columns(&self, table_name: &str) -> Result<Vec<SqlColumn>, WarehouseError> {
        let sql = format!("SELECT * FROM {} LIMIT 0", quote_identifier(table_name));
        let mut statement = self.connection.prepare(sql.as_str())?;
        let _ = statement.query([] as [&dyn ToSql; 0])?;

        let column_count = statement.column_count();
        let mut columns = Vec::with_capacity(column_count);
        for index in 0..column_count {
            let name = statement
                .column_name(index)
                .map(|name| name.to_string())
                .unwrap_or_else(|_| format!("column_{index}"));
            let data_type = statement.column_type(index);
            columns.push(SqlColumn {
                name,
                r#type: data_type.to_string(),
                kind: ColumnKind::from_duck_type(&DuckType::from(&data_type)),
            });
        }
        Ok(columns)
    }

    /// Resolve a requested table name to the name stored in the catalog.
    fn resolve_table(&self, table: &str) -> Result<String, WarehouseError> {
        let requested = table.trim();
        if !is_plain_identifier(requested) {
            return Err(WarehouseError::UnknownTable(table.to_string()));
        }

        let params: [&dyn ToSql; 1] = [&requested];
        let mut statement = self.connection.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE lower(table_name) = lower(?) ORDER BY table_name LIMIT 1",
        )?;
        let mut rows = statement.query(params.as_slice())?;
        match rows.next()? {
            Some(row) => Ok(row.get::<_, String>(0)?),
            None => Err(WarehouseError::UnknownTable(table.to_string())),
        }
    }

    /// Map normalized column names (trimmed, lowercase) to the raw names the
    /// table defines, preserving request order.
    fn resolve_columns(
        &self,
        table_name: &str,
        wanted: &[&str],
    ) -> Result<Vec<String>, WarehouseError> {
        let params: [&dyn ToSql; 1] = [&table_name];
        let mut statement = self.connection.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let raw_names = statement
            .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        wanted
            .iter()
            .map(|wanted| {
                raw_names
                    .iter()
                    .find(|raw| raw.trim().to_lowercase() == *wanted)
                    .cloned()
                    .ok_or_else(|| WarehouseError::UnknownColumn {
                        table: table_name.to_string(),
                        column: (*wanted).to_string(),
                    })
            })
            .collect()
    }
}

/// Read a single row from the result set.
fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

/// Convert a DuckDB value to a JSON value.
fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::HugeInt(value) => match i64::try_from(value) {
            Ok(value) => Value::Number(Number::from(value)),
            Err(_) => number_from_f64(value as f64),
        },
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Decimal(value) => value
            .to_string()
            .parse::<f64>()
            .map(number_from_f64)
            .unwrap_or(Value::Null),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

/// Convert an f64 to a JSON number, returning Null for NaN/Inf.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Whether `name` is safe to use as an unquoted SQL identifier.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Quote an identifier read from the catalog.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Resolve the paylens home directory from environment or default.
fn resolve_paylens_home() -> PathBuf {
    if let Some(path) = env::var_os("PAYLENS_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".paylens");
    }

    PathBuf::from(".paylens")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(db_path: &Path, sql: &str) {
        let connection = Connection::open(db_path).expect("seed connection");
        connection.execute_batch(sql).expect("seed sql");
    }

    fn open_store(temp: &tempfile::TempDir) -> Store {
        Store::open(StoreConfig {
            home: temp.path().to_path_buf(),
            db_path: temp.path().join("pulse.duckdb"),
        })
        .expect("store open")
    }

    #[test]
    fn missing_database_file_is_unavailable() {
        let temp = tempdir().expect("tempdir");
        let result = Store::open(StoreConfig {
            home: temp.path().to_path_buf(),
            db_path: temp.path().join("absent.duckdb"),
        });

        assert!(matches!(result, Err(WarehouseError::StoreUnavailable(_))));
    }

    #[test]
    fn fetch_returns_raw_columns_and_rows_in_order() {
        let temp = tempdir().expect("tempdir");
        seed(
            &temp.path().join("pulse.duckdb"),
            r#"CREATE TABLE agg_trans (" Year " INTEGER, "State" TEXT, transaction_amount DOUBLE);
               INSERT INTO agg_trans VALUES (2023, 'goa', 10.5), (2022, 'assam', 3.0);"#,
        );
        let store = open_store(&temp);

        let table = store.fetch_table("agg_trans").expect("fetch");
        let names = table
            .columns
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![" Year ", "State", "transaction_amount"]);
        assert_eq!(table.columns[0].kind, ColumnKind::Integer);
        assert_eq!(table.columns[1].kind, ColumnKind::Text);
        assert_eq!(table.columns[2].kind, ColumnKind::Float);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], Value::String("goa".to_string()));
        assert_eq!(table.rows[1][0], Value::Number(Number::from(2022)));
    }

    #[test]
    fn column_description_scans_no_rows() {
        let temp = tempdir().expect("tempdir");
        seed(
            &temp.path().join("pulse.duckdb"),
            "CREATE TABLE top_users (state TEXT, registered_users BIGINT);
             CREATE TABLE map_user (state TEXT, registered_users BIGINT);
             INSERT INTO map_user VALUES ('goa', 1), ('goa', 2), ('assam', 3);",
        );
        let store = open_store(&temp);

        let described = store.describe_columns("map_user").expect("describe");
        let kinds = described.iter().map(|column| column.kind).collect::<Vec<_>>();
        assert_eq!(kinds, vec![ColumnKind::Text, ColumnKind::Integer]);

        let empty = store.fetch_table("top_users").expect("fetch empty");
        assert_eq!(empty.columns.len(), 2);
        assert!(empty.rows.is_empty());

        let full = store.fetch_table("map_user").expect("fetch");
        assert_eq!(full.columns, described);
        assert_eq!(full.rows.len(), 3);
    }

    #[test]
    fn debug_output_names_the_database_file() {
        let temp = tempdir().expect("tempdir");
        seed(&temp.path().join("pulse.duckdb"), "CREATE TABLE map_user (state TEXT);");
        let store = open_store(&temp);

        let rendered = format!("{store:?}");
        assert!(rendered.starts_with("Store"));
        assert!(rendered.contains("pulse.duckdb"));
    }

    #[test]
    fn unknown_table_is_reported() {
        let temp = tempdir().expect("tempdir");
        seed(&temp.path().join("pulse.duckdb"), "CREATE TABLE agg_trans (year INTEGER);");
        let store = open_store(&temp);

        let error = store.fetch_table("agg_insur").expect_err("no such table");
        assert!(matches!(error, WarehouseError::UnknownTable(ref name) if name == "agg_insur"));
    }

    #[test]
    fn table_names_are_never_interpolated() {
        let temp = tempdir().expect("tempdir");
        seed(&temp.path().join("pulse.duckdb"), "CREATE TABLE agg_trans (year INTEGER);");
        let store = open_store(&temp);

        let error = store
            .fetch_table("agg_trans; DROP TABLE agg_trans")
            .expect_err("must reject");
        assert!(matches!(error, WarehouseError::UnknownTable(_)));
        assert_eq!(store.table_names().expect("names"), vec!["agg_trans".to_string()]);
    }

    #[test]
    fn decimal_and_null_cells_convert() {
        let temp = tempdir().expect("tempdir");
        seed(
            &temp.path().join("pulse.duckdb"),
            "CREATE TABLE map_user (registered_users DECIMAL(12,2), app_opens BIGINT);
             INSERT INTO map_user VALUES (12.50, NULL);",
        );
        let store = open_store(&temp);

        let table = store.fetch_table("MAP_USER").expect("fetch is case-insensitive");
        assert_eq!(table.columns[0].kind, ColumnKind::Float);
        assert_eq!(table.rows[0][0].as_f64(), Some(12.5));
        assert_eq!(table.rows[0][1], Value::Null);
    }

    #[test]
    fn plain_identifier_rules() {
        assert!(is_plain_identifier("agg_trans"));
        assert!(is_plain_identifier("_x1"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("1abc"));
        assert!(!is_plain_identifier("a-b"));
        assert!(!is_plain_identifier("a b"));
    }
}
