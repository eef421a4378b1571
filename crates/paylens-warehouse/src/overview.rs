//! Aggregate `SUM` queries backing the overview page.
//!
//! Every query here is a plain `SELECT`; identifiers are resolved against
//! `information_schema` first and quoted before they reach the SQL text.

use ::duckdb::types::Value as DuckValue;

use crate::{quote_identifier, Store, WarehouseError};

/// Per-state metric sums read from one table.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTotals {
    /// Store identifier of the state (e.g. `andhra-pradesh`).
    pub state: String,
    /// One sum per requested column, in request order. `None` when every
    /// contributing cell was NULL.
    pub values: Vec<Option<f64>>,
}

impl Store {
    /// Sum each column over the whole table.
    ///
    /// `SUM` over zero rows is SQL `NULL`; it comes back as `None`, never 0.
    ///
    /// # Errors
    /// Returns [`WarehouseError::UnknownTable`] or
    /// [`WarehouseError::UnknownColumn`] for schema mismatches, and
    /// [`WarehouseError::DuckDb`] if the query fails.
    pub fn column_totals(
        &self,
        table: &str,
        columns: &[&str],
    ) -> Result<Vec<Option<f64>>, WarehouseError> {
        let table_name = self.resolve_table(table)?;
        let resolved = self.resolve_columns(&table_name, columns)?;

        let select_list = resolved
            .iter()
            .map(|column| format!("CAST(SUM({}) AS DOUBLE)", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {select_list} FROM {}",
            quote_identifier(&table_name)
        );

        let totals = self.connection().query_row(sql.as_str(), [], |row| {
            (0..resolved.len())
                .map(|index| row.get::<_, Option<f64>>(index))
                .collect::<Result<Vec<_>, _>>()
        })?;

        tracing::debug!(table = %table_name, columns = columns.len(), "column totals read");
        Ok(totals)
    }

    /// Sum each column per distinct `state` value, ordered by state.
    ///
    /// # Errors
    /// Same as [`Store::column_totals`]; the table must also carry a
    /// `state` column.
    pub fn state_totals(
        &self,
        table: &str,
        columns: &[&str],
    ) -> Result<Vec<StateTotals>, WarehouseError> {
        let table_name = self.resolve_table(table)?;
        let state_column = self.resolve_columns(&table_name, &["state"])?.remove(0);
        let resolved = self.resolve_columns(&table_name, columns)?;

        let state = quote_identifier(&state_column);
        let mut select_list = vec![format!("CAST({state} AS VARCHAR)")];
        select_list.extend(
            resolved
                .iter()
                .map(|column| format!("CAST(SUM({}) AS DOUBLE)", quote_identifier(column))),
        );
        let sql = format!(
            "SELECT {} FROM {} WHERE {state} IS NOT NULL GROUP BY {state} ORDER BY {state}",
            select_list.join(", "),
            quote_identifier(&table_name)
        );

        let mut statement = self.connection().prepare(sql.as_str())?;
        let mut rows = statement.query([])?;
        let mut output = Vec::new();
        while let Some(row) = rows.next()? {
            let state = match row.get::<_, DuckValue>(0)? {
                DuckValue::Text(text) => text,
                other => format!("{other:?}"),
            };
            let values = (1..=resolved.len())
                .map(|index| row.get::<_, Option<f64>>(index))
                .collect::<Result<Vec<_>, _>>()?;
            output.push(StateTotals { state, values });
        }

        tracing::debug!(table = %table_name, states = output.len(), "state totals read");
        Ok(output)
    }
}
