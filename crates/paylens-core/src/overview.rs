//! Home-page figures: per-table totals, combined totals, the state map and
//! the top-states leaderboard.

use std::collections::BTreeMap;

use paylens_warehouse::{StateTotals, Store};
use serde::Serialize;

use crate::aggregate::GEOGRAPHY_TOP_N;
use crate::geography;
use crate::PipelineError;

const TRANSACTION_METRICS: &[&str] = &["transaction_count", "transaction_amount"];
const INSURANCE_METRICS: &[&str] = &["insurance_count", "insurance_amount"];

/// Tables summed on the home page and the columns summed in each.
pub const SOURCES: &[(&str, &[&str])] = &[
    ("agg_trans", TRANSACTION_METRICS),
    ("map_trans", TRANSACTION_METRICS),
    ("top_trans", TRANSACTION_METRICS),
    ("agg_insur", INSURANCE_METRICS),
    ("map_insur", INSURANCE_METRICS),
    ("top_insur", INSURANCE_METRICS),
    ("map_user", &["registered_users", "app_opens"]),
    ("top_users", &["registered_users"]),
];

/// `SUM` of one column; `None` when the table had no non-null cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTotal {
    pub column: String,
    pub total: Option<f64>,
}

/// Column sums of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTotals {
    pub table: String,
    pub metrics: Vec<MetricTotal>,
}

impl SourceTotals {
    pub fn new(table: impl Into<String>, columns: &[&str], totals: Vec<Option<f64>>) -> Self {
        Self {
            table: table.into(),
            metrics: columns
                .iter()
                .zip(totals)
                .map(|(column, total)| MetricTotal {
                    column: (*column).to_string(),
                    total,
                })
                .collect(),
        }
    }

    pub fn total(&self, column: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|metric| metric.column == column)
            .and_then(|metric| metric.total)
    }
}

/// Headline figures across all sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverviewTotals {
    pub transactions: Option<f64>,
    pub transaction_amount: Option<f64>,
    pub insurance_policies: Option<f64>,
    pub insurance_amount: Option<f64>,
    pub registered_users: Option<f64>,
    pub app_opens: Option<f64>,
}

/// One state on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMapEntry {
    /// Store identifier.
    pub id: String,
    pub name: String,
    pub matched: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub transaction_amount: Option<f64>,
    pub transaction_count: Option<f64>,
    pub insurance_amount: Option<f64>,
    pub insurance_count: Option<f64>,
    pub registered_users: Option<f64>,
    /// Transaction amount plus insurance amount.
    pub total_value: Option<f64>,
}

/// One row of the top-states leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopState {
    pub id: String,
    pub name: String,
    pub total_value: f64,
    /// `total_value` relative to the largest state, in `[0, 1]`.
    pub share_of_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub sources: Vec<SourceTotals>,
    pub totals: OverviewTotals,
    pub states: Vec<StateMapEntry>,
    pub top_states: Vec<TopState>,
    /// Store identifiers missing from the region table.
    pub unmatched_states: Vec<String>,
}

/// Add the defined parts. Undefined only when every part is undefined.
pub fn add_defined(parts: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    parts.into_iter().flatten().reduce(|left, right| left + right)
}

fn combined(sources: &[SourceTotals], tables: &[&str], column: &str) -> Option<f64> {
    add_defined(
        sources
            .iter()
            .filter(|source| tables.contains(&source.table.as_str()))
            .map(|source| source.total(column)),
    )
}

/// Per-state sums feeding the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateInputs {
    /// `agg_trans`: transaction amount, transaction count.
    pub transactions: Vec<StateTotals>,
    /// `agg_insur`: insurance amount, insurance count.
    pub insurance: Vec<StateTotals>,
    /// `map_user`: registered users.
    pub users: Vec<StateTotals>,
}

#[derive(Default)]
struct StateAccumulator {
    transaction_amount: Option<f64>,
    transaction_count: Option<f64>,
    insurance_amount: Option<f64>,
    insurance_count: Option<f64>,
    registered_users: Option<f64>,
}

fn value_at(totals: &StateTotals, index: usize) -> Option<f64> {
    totals.values.get(index).copied().flatten()
}

/// Build the overview from already-queried sums.
pub fn assemble_overview(sources: Vec<SourceTotals>, inputs: &StateInputs) -> Overview {
    let trans = ["agg_trans", "map_trans", "top_trans"];
    let insur = ["agg_insur", "map_insur", "top_insur"];
    let totals = OverviewTotals {
        transactions: combined(&sources, &trans, "transaction_count"),
        transaction_amount: combined(&sources, &trans, "transaction_amount"),
        insurance_policies: combined(&sources, &insur, "insurance_count"),
        insurance_amount: combined(&sources, &insur, "insurance_amount"),
        registered_users: combined(&sources, &["map_user", "top_users"], "registered_users"),
        app_opens: combined(&sources, &["map_user"], "app_opens"),
    };

    let mut merged = BTreeMap::<&str, StateAccumulator>::new();
    for row in &inputs.transactions {
        let entry = merged.entry(row.state.as_str()).or_default();
        entry.transaction_amount = add_defined([entry.transaction_amount, value_at(row, 0)]);
        entry.transaction_count = add_defined([entry.transaction_count, value_at(row, 1)]);
    }
    for row in &inputs.insurance {
        let entry = merged.entry(row.state.as_str()).or_default();
        entry.insurance_amount = add_defined([entry.insurance_amount, value_at(row, 0)]);
        entry.insurance_count = add_defined([entry.insurance_count, value_at(row, 1)]);
    }
    for row in &inputs.users {
        let entry = merged.entry(row.state.as_str()).or_default();
        entry.registered_users = add_defined([entry.registered_users, value_at(row, 0)]);
    }

    let states = merged
        .into_iter()
        .map(|(id, sums)| {
            let geo = geography::resolve(id);
            StateMapEntry {
                id: id.to_string(),
                name: geo.name,
                matched: geo.matched,
                lat: geo.lat,
                lon: geo.lon,
                total_value: add_defined([sums.transaction_amount, sums.insurance_amount]),
                transaction_amount: sums.transaction_amount,
                transaction_count: sums.transaction_count,
                insurance_amount: sums.insurance_amount,
                insurance_count: sums.insurance_count,
                registered_users: sums.registered_users,
            }
        })
        .collect::<Vec<_>>();

    let unmatched_states = states
        .iter()
        .filter(|state| !state.matched)
        .map(|state| state.id.clone())
        .collect::<Vec<_>>();
    if !unmatched_states.is_empty() {
        tracing::warn!(states = ?unmatched_states, "state identifiers without a map region");
    }

    Overview {
        top_states: top_states(&states, GEOGRAPHY_TOP_N),
        sources,
        totals,
        states,
        unmatched_states,
    }
}

/// The `n` states with the largest defined `total_value`, descending.
pub fn top_states(states: &[StateMapEntry], n: usize) -> Vec<TopState> {
    let mut ranked = states
        .iter()
        .filter_map(|state| state.total_value.map(|value| (state, value)))
        .collect::<Vec<_>>();
    ranked.sort_by(|left, right| right.1.total_cmp(&left.1));

    let max = ranked.first().map(|(_, value)| *value).unwrap_or(0.0);
    ranked
        .into_iter()
        .take(n)
        .map(|(state, value)| TopState {
            id: state.id.clone(),
            name: state.name.clone(),
            total_value: value,
            share_of_max: if max > 0.0 {
                (value / max).clamp(0.0, 1.0)
            } else {
                0.0
            },
        })
        .collect()
}

/// Query every source and assemble the overview.
///
/// # Errors
/// [`PipelineError::UnknownTable`] or [`PipelineError::MissingColumn`] when a
/// source table does not match its expected schema;
/// [`PipelineError::StoreUnavailable`] when a query fails.
pub fn load_overview(store: &Store) -> Result<Overview, PipelineError> {
    let sources = SOURCES
        .iter()
        .map(|(table, columns)| {
            store
                .column_totals(table, columns)
                .map(|totals| SourceTotals::new(*table, columns, totals))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let inputs = StateInputs {
        transactions: store.state_totals("agg_trans", &["transaction_amount", "transaction_count"])?,
        insurance: store.state_totals("agg_insur", &["insurance_amount", "insurance_count"])?,
        users: store.state_totals("map_user", &["registered_users"])?,
    };

    let overview = assemble_overview(sources, &inputs);
    tracing::debug!(
        sources = overview.sources.len(),
        states = overview.states.len(),
        "overview assembled"
    );
    Ok(overview)
}
