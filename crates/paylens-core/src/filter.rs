//! Slice filter: equality predicates on `year`, `quarter` and `state`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::NormalizedTable;
use crate::value::as_integer;
use crate::PipelineError;

/// Optional equality constraints defining one analysis slice.
///
/// `None` means "All": the field matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl FilterSpec {
    /// The unconstrained spec.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_quarter(mut self, quarter: i64) -> Self {
        self.quarter = Some(quarter);
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.year.is_none() && self.quarter.is_none() && self.state.is_none()
    }

    /// Conjunction of two specs.
    ///
    /// Returns `None` when both constrain the same field to different values;
    /// no row can satisfy such a conjunction.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        Some(Self {
            year: conjoin(&self.year, &other.year)?,
            quarter: conjoin(&self.quarter, &other.quarter)?,
            state: conjoin(&self.state, &other.state)?,
        })
    }
}

fn conjoin<T: Clone + PartialEq>(left: &Option<T>, right: &Option<T>) -> Option<Option<T>> {
    match (left, right) {
        (Some(left), Some(right)) if left != right => None,
        (Some(value), _) | (None, Some(value)) => Some(Some(value.clone())),
        (None, None) => Some(None),
    }
}

/// Column positions of the constrained fields, resolved once per filter.
struct Predicate<'a> {
    year: Option<(usize, i64)>,
    quarter: Option<(usize, i64)>,
    state: Option<(usize, &'a str)>,
}

impl<'a> Predicate<'a> {
    fn resolve(table: &NormalizedTable, spec: &'a FilterSpec) -> Result<Self, PipelineError> {
        let year = spec
            .year
            .map(|year| table.require_column("year").map(|index| (index, year)))
            .transpose()?;
        let quarter = spec
            .quarter
            .map(|quarter| table.require_column("quarter").map(|index| (index, quarter)))
            .transpose()?;
        let state = spec
            .state
            .as_deref()
            .map(|state| table.require_column("state").map(|index| (index, state)))
            .transpose()?;
        Ok(Self {
            year,
            quarter,
            state,
        })
    }

    fn matches(&self, row: &[Value]) -> bool {
        let integer_matches = |constraint: Option<(usize, i64)>| {
            constraint.is_none_or(|(index, wanted)| as_integer(&row[index]) == Some(wanted))
        };
        let state_matches = self.state.is_none_or(|(index, wanted)| {
            matches!(&row[index], Value::String(state) if state == wanted)
        });

        integer_matches(self.year) && integer_matches(self.quarter) && state_matches
    }
}

/// Rows of a normalized table that satisfy one [`FilterSpec`].
///
/// Same schema as the source table; rows keep their original order. An
/// empty view is a valid result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredView {
    table: NormalizedTable,
}

impl FilteredView {
    pub fn table(&self) -> &NormalizedTable {
        &self.table
    }

    pub fn into_table(self) -> NormalizedTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Apply a further spec on top of this view.
    pub fn refine(&self, spec: &FilterSpec) -> Result<FilteredView, PipelineError> {
        filter(&self.table, spec)
    }
}

/// Keep the rows of `table` that satisfy every constraint in `spec`.
///
/// `year` and `quarter` compare as integers; `state` is an exact string
/// match with no case folding.
///
/// # Errors
/// [`PipelineError::MissingColumn`] when `spec` constrains a column the
/// table does not have.
pub fn filter(table: &NormalizedTable, spec: &FilterSpec) -> Result<FilteredView, PipelineError> {
    if spec.is_unconstrained() {
        return Ok(FilteredView {
            table: table.clone(),
        });
    }

    let predicate = Predicate::resolve(table, spec)?;
    let rows = table
        .rows()
        .iter()
        .filter(|row| predicate.matches(row))
        .cloned()
        .collect::<Vec<_>>();

    tracing::debug!(
        table = table.name(),
        before = table.len(),
        after = rows.len(),
        "slice filter applied"
    );

    Ok(FilteredView {
        table: table.with_rows(rows),
    })
}

/// Distinct values offered by the year/quarter/state drop-downs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub years: Vec<i64>,
    pub quarters: Vec<i64>,
    pub states: Vec<String>,
}

impl FilterOptions {
    /// Collect sorted distinct values. Cells of the wrong type are skipped.
    ///
    /// # Errors
    /// [`PipelineError::MissingColumn`] if any of the three columns is absent.
    pub fn from_table(table: &NormalizedTable) -> Result<Self, PipelineError> {
        let year = table.require_column("year")?;
        let quarter = table.require_column("quarter")?;
        let state = table.require_column("state")?;

        let mut years = BTreeSet::new();
        let mut quarters = BTreeSet::new();
        let mut states = BTreeSet::new();
        for row in table.rows() {
            years.extend(as_integer(&row[year]));
            quarters.extend(as_integer(&row[quarter]));
            if let Value::String(name) = &row[state] {
                states.insert(name.clone());
            }
        }

        Ok(Self {
            years: years.into_iter().collect(),
            quarters: quarters.into_iter().collect(),
            states: states.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use paylens_warehouse::{ColumnKind, SqlColumn, StoreTable};
    use serde_json::json;

    fn column(name: &str, kind: ColumnKind) -> SqlColumn {
        SqlColumn {
            name: name.to_string(),
            r#type: String::from("ANY"),
            kind,
        }
    }

    fn sample() -> NormalizedTable {
        normalize(StoreTable {
            name: "agg_trans".to_string(),
            columns: vec![
                column("Year", ColumnKind::Integer),
                column("Quarter", ColumnKind::Integer),
                column("State", ColumnKind::Text),
                column("Transaction_Amount", ColumnKind::Float),
            ],
            rows: vec![
                vec![json!(2022), json!(1), json!("goa"), json!(1.0)],
                vec![json!(2023), json!(1), json!("goa"), json!(2.0)],
                vec![json!(2023), json!(2), json!("karnataka"), json!(3.0)],
                vec![json!(2023.0), json!(2), json!("Goa"), json!(4.0)],
                vec![json!(2024), json!(4), json!("karnataka"), json!(5.0)],
            ],
        })
    }

    fn amounts(view: &FilteredView) -> Vec<f64> {
        view.table()
            .rows()
            .iter()
            .filter_map(|row| row[3].as_f64())
            .collect()
    }

    #[test]
    fn unconstrained_spec_is_identity() {
        let table = sample();
        let view = filter(&table, &FilterSpec::all()).expect("filter");
        assert_eq!(view.table(), &table);
    }

    #[test]
    fn unconstrained_spec_needs_no_filter_columns() {
        assert!(FilterSpec::all().is_unconstrained());
        assert!(!FilterSpec::all().with_quarter(1).is_unconstrained());

        let table = normalize(StoreTable {
            name: "top_users".to_string(),
            columns: vec![column("registered_users", ColumnKind::Integer)],
            rows: vec![vec![json!(7)], vec![json!(9)]],
        });
        let view = filter(&table, &FilterSpec::all()).expect("filter");
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn year_compares_as_integer() {
        let view = filter(&sample(), &FilterSpec::all().with_year(2023)).expect("filter");
        assert_eq!(amounts(&view), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn state_match_is_exact() {
        let view = filter(&sample(), &FilterSpec::all().with_state("goa")).expect("filter");
        assert_eq!(amounts(&view), vec![1.0, 2.0]);
    }

    #[test]
    fn no_match_yields_empty_view() {
        let view = filter(&sample(), &FilterSpec::all().with_state("delhi")).expect("filter");
        assert!(view.is_empty());
        assert_eq!(view.table().columns().len(), 4);
    }

    #[test]
    fn filters_compose_in_any_order() {
        let table = sample();
        let first = FilterSpec::all().with_year(2023);
        let second = FilterSpec::all().with_quarter(2).with_state("karnataka");

        let forward = filter(&table, &first)
            .and_then(|view| view.refine(&second))
            .expect("forward");
        let backward = filter(&table, &second)
            .and_then(|view| view.refine(&first))
            .expect("backward");
        let combined = filter(&table, &first.intersect(&second).expect("compatible"))
            .expect("combined");

        assert_eq!(forward, combined);
        assert_eq!(backward, combined);
        assert_eq!(amounts(&combined), vec![3.0]);
    }

    #[test]
    fn conflicting_constraints_do_not_intersect() {
        let left = FilterSpec::all().with_year(2022);
        let right = FilterSpec::all().with_year(2023);
        assert_eq!(left.intersect(&right), None);

        let view = filter(&sample(), &left)
            .and_then(|view| view.refine(&right))
            .expect("sequential");
        assert!(view.is_empty());
    }

    #[test]
    fn constraining_absent_column_fails() {
        let table = normalize(StoreTable {
            name: "top_trans".to_string(),
            columns: vec![column("year", ColumnKind::Integer)],
            rows: vec![vec![json!(2023)]],
        });

        let error = filter(&table, &FilterSpec::all().with_state("goa")).expect_err("no state");
        assert_eq!(
            error,
            PipelineError::MissingColumn {
                column: "state".to_string()
            }
        );
        assert!(filter(&table, &FilterSpec::all().with_year(2023)).is_ok());
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let options = FilterOptions::from_table(&sample()).expect("options");
        assert_eq!(options.years, vec![2022, 2023, 2024]);
        assert_eq!(options.quarters, vec![1, 2, 4]);
        assert_eq!(options.states, vec!["Goa", "goa", "karnataka"]);
    }
}
