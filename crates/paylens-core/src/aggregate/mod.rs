//! Aggregation views over one filtered slice.
//!
//! The grouping key is resolved once per request by
//! [`resolve_grouping_key`] and then shared by every grouped, ranked,
//! stacked and distribution view, so all of them agree on the key even when
//! the category column is missing and `state` stands in for it.

mod correlation;
mod distribution;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::FilteredView;
use crate::normalize::{normalize_column_name, NormalizedTable};
use crate::value::{as_integer, as_number, GroupKey};
use crate::PipelineError;

pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use distribution::{amount_distribution, amount_histogram, GroupDistribution, HistogramBin};

/// Length of category and state rankings.
pub const CATEGORY_TOP_N: usize = 10;
/// Length of geographic leaderboards.
pub const GEOGRAPHY_TOP_N: usize = 5;
/// Rows kept in the tabular preview.
pub const PREVIEW_ROWS: usize = 100;
/// Default bin count of the amount histogram.
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Fallback grouping column when the category column is absent.
const FALLBACK_KEY: &str = "state";

/// Columns an analysis reads: the category dimension and two metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub category_column: String,
    pub count_metric: String,
    pub amount_metric: String,
}

impl MetricSpec {
    pub fn new(
        category_column: impl Into<String>,
        count_metric: impl Into<String>,
        amount_metric: impl Into<String>,
    ) -> Self {
        Self {
            category_column: category_column.into(),
            count_metric: count_metric.into(),
            amount_metric: amount_metric.into(),
        }
    }
}

/// The column every grouped view of one request groups by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupingKey {
    /// Normalized column name.
    pub column: String,
    /// `true` when the category column was absent and `state` was used.
    pub fallback: bool,
}

/// Pick the grouping column: the category column if the table has it, else
/// `state`.
///
/// # Errors
/// [`PipelineError::MissingColumn`] naming the category column when neither
/// column exists.
pub fn resolve_grouping_key(
    table: &NormalizedTable,
    category_column: &str,
) -> Result<GroupingKey, PipelineError> {
    let category = normalize_column_name(category_column);
    if table.has_column(&category) {
        return Ok(GroupingKey {
            column: category,
            fallback: false,
        });
    }

    if table.has_column(FALLBACK_KEY) {
        tracing::info!(
            table = table.name(),
            category = %category,
            "category column absent, grouping by state"
        );
        return Ok(GroupingKey {
            column: FALLBACK_KEY.to_string(),
            fallback: true,
        });
    }

    Err(PipelineError::missing_column(category))
}

/// Amount and count totals of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSum {
    pub group: String,
    pub count: f64,
    pub amount: f64,
}

/// Scalar totals of the slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub rows: usize,
    pub total_amount: f64,
    pub total_count: f64,
    /// Mean amount over non-null cells; `None` when there are none.
    pub mean_amount: Option<f64>,
}

/// Amount and count totals of one `(year, quarter)` period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPoint {
    pub year: i64,
    pub quarter: i64,
    pub label: String,
    pub amount: f64,
    pub count: f64,
}

/// Amount total of one group within one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearGroupAmount {
    pub year: i64,
    pub group: String,
    pub amount: f64,
}

/// First rows of the slice, column names included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// `true` when the slice holds more rows than the preview shows.
    pub truncated: bool,
}

/// Knobs of [`aggregate_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    pub top_n: usize,
    pub histogram_bins: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_n: CATEGORY_TOP_N,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

/// Every derived view of one slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub grouping: GroupingKey,
    pub grouped: Vec<GroupedSum>,
    pub top: Vec<GroupedSum>,
    pub correlation: CorrelationMatrix,
    pub summary: MetricSummary,
    pub trend: Vec<PeriodPoint>,
    pub yearly: Vec<YearGroupAmount>,
    pub distribution: Vec<GroupDistribution>,
    pub histogram: Vec<HistogramBin>,
    pub preview: Preview,
}

/// Metric cells of a table read as optional floats, one entry per row.
struct MetricColumns {
    count: Vec<Option<f64>>,
    amount: Vec<Option<f64>>,
}

impl MetricColumns {
    fn read(table: &NormalizedTable, metrics: &MetricSpec) -> Result<Self, PipelineError> {
        Ok(Self {
            count: read_metric(table, &metrics.count_metric)?,
            amount: read_metric(table, &metrics.amount_metric)?,
        })
    }
}

/// Read a metric column. NULL cells are `None`; any other non-number fails.
fn read_metric(
    table: &NormalizedTable,
    column: &str,
) -> Result<Vec<Option<f64>>, PipelineError> {
    let index = table.require_column(column)?;
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(row, cells)| match &cells[index] {
            Value::Null => Ok(None),
            value => as_number(value).map(Some).ok_or_else(|| {
                PipelineError::NonNumericValue {
                    column: normalize_column_name(column),
                    row,
                }
            }),
        })
        .collect()
}

/// Typed group key of every row under `key`.
fn group_keys(
    table: &NormalizedTable,
    key: &GroupingKey,
) -> Result<Vec<GroupKey>, PipelineError> {
    let index = table.require_column(&key.column)?;
    Ok(table.rows().iter().map(|row| GroupKey::of(&row[index])).collect())
}

/// Per-group amount and count sums, ordered by key: numbers, then text, with
/// the NULL group last.
///
/// Keys are typed, so NULL (labelled `"null"`) and the text `"null"` are two
/// groups. NULL metric cells add 0, so the group totals always add up to the
/// slice totals.
pub fn grouped_sums(
    view: &FilteredView,
    key: &GroupingKey,
    metrics: &MetricSpec,
) -> Result<Vec<GroupedSum>, PipelineError> {
    let columns = MetricColumns::read(view.table(), metrics)?;
    let keys = group_keys(view.table(), key)?;
    Ok(sum_by_group(&keys, &columns))
}

fn sum_by_group(keys: &[GroupKey], columns: &MetricColumns) -> Vec<GroupedSum> {
    let mut groups = BTreeMap::<&GroupKey, (f64, f64)>::new();
    for (index, key) in keys.iter().enumerate() {
        let entry = groups.entry(key).or_default();
        entry.0 += columns.count[index].unwrap_or(0.0);
        entry.1 += columns.amount[index].unwrap_or(0.0);
    }

    groups
        .into_iter()
        .map(|(group, (count, amount))| GroupedSum {
            group: group.label(),
            count,
            amount,
        })
        .collect()
}

/// The `n` largest groups by amount, descending. Ties keep input order.
pub fn top_n(sums: &[GroupedSum], n: usize) -> Vec<GroupedSum> {
    let mut ranked = sums.to_vec();
    ranked.sort_by(|left, right| right.amount.total_cmp(&left.amount));
    ranked.truncate(n);
    ranked
}

/// Totals and mean of the slice.
pub fn summarize(view: &FilteredView, metrics: &MetricSpec) -> Result<MetricSummary, PipelineError> {
    let columns = MetricColumns::read(view.table(), metrics)?;
    Ok(summary_of(view.len(), &columns))
}

fn summary_of(rows: usize, columns: &MetricColumns) -> MetricSummary {
    let amounts = columns.amount.iter().flatten().copied().collect::<Vec<_>>();
    // `Iterator::sum` over nothing is -0.0; start the totals from +0.0.
    let total_amount = amounts.iter().fold(0.0, |total, value| total + value);
    let total_count = columns.count.iter().flatten().fold(0.0, |total, value| total + value);
    let mean_amount = (!amounts.is_empty()).then(|| total_amount / amounts.len() as f64);

    MetricSummary {
        rows,
        total_amount,
        total_count,
        mean_amount,
    }
}

/// Amount and count per `(year, quarter)`, chronological.
///
/// Rows whose year or quarter is NULL have no period and are skipped.
pub fn period_trend(
    view: &FilteredView,
    metrics: &MetricSpec,
) -> Result<Vec<PeriodPoint>, PipelineError> {
    let columns = MetricColumns::read(view.table(), metrics)?;
    trend_of(view.table(), &columns)
}

fn trend_of(
    table: &NormalizedTable,
    columns: &MetricColumns,
) -> Result<Vec<PeriodPoint>, PipelineError> {
    let year_index = table.require_column("year")?;
    let quarter_index = table.require_column("quarter")?;

    let mut periods = BTreeMap::<(i64, i64), (f64, f64)>::new();
    for (index, row) in table.rows().iter().enumerate() {
        let (Some(year), Some(quarter)) = (
            as_integer(&row[year_index]),
            as_integer(&row[quarter_index]),
        ) else {
            continue;
        };
        let entry = periods.entry((year, quarter)).or_default();
        entry.0 += columns.amount[index].unwrap_or(0.0);
        entry.1 += columns.count[index].unwrap_or(0.0);
    }

    Ok(periods
        .into_iter()
        .map(|((year, quarter), (amount, count))| PeriodPoint {
            year,
            quarter,
            label: format!("{year}-Q{quarter}"),
            amount,
            count,
        })
        .collect())
}

/// Amount per `(year, group)`, ordered by year then group.
pub fn yearly_breakdown(
    view: &FilteredView,
    key: &GroupingKey,
    metrics: &MetricSpec,
) -> Result<Vec<YearGroupAmount>, PipelineError> {
    let columns = MetricColumns::read(view.table(), metrics)?;
    let keys = group_keys(view.table(), key)?;
    yearly_of(view.table(), &keys, &columns)
}

fn yearly_of(
    table: &NormalizedTable,
    keys: &[GroupKey],
    columns: &MetricColumns,
) -> Result<Vec<YearGroupAmount>, PipelineError> {
    let year_index = table.require_column("year")?;

    let mut cells = BTreeMap::<(i64, &GroupKey), f64>::new();
    for (index, row) in table.rows().iter().enumerate() {
        let Some(year) = as_integer(&row[year_index]) else {
            continue;
        };
        *cells.entry((year, &keys[index])).or_default() +=
            columns.amount[index].unwrap_or(0.0);
    }

    Ok(cells
        .into_iter()
        .map(|((year, group), amount)| YearGroupAmount {
            year,
            group: group.label(),
            amount,
        })
        .collect())
}

/// The first [`PREVIEW_ROWS`] rows of the slice.
pub fn preview(view: &FilteredView) -> Preview {
    let table = view.table();
    Preview {
        columns: table
            .columns()
            .iter()
            .map(|column| column.name.clone())
            .collect(),
        rows: table.rows().iter().take(PREVIEW_ROWS).cloned().collect(),
        truncated: table.len() > PREVIEW_ROWS,
    }
}

/// Compute every view with default options.
pub fn aggregate(
    view: &FilteredView,
    metrics: &MetricSpec,
) -> Result<AggregationResult, PipelineError> {
    aggregate_with(view, metrics, AggregateOptions::default())
}

/// Compute every view of one slice.
///
/// # Errors
/// [`PipelineError::MissingColumn`] when a metric column, the grouping
/// columns, `year` or `quarter` are absent;
/// [`PipelineError::NonNumericValue`] when a metric cell is not a number;
/// [`PipelineError::InvalidRequest`] for a zero ranking length or bin count.
pub fn aggregate_with(
    view: &FilteredView,
    metrics: &MetricSpec,
    options: AggregateOptions,
) -> Result<AggregationResult, PipelineError> {
    if options.top_n == 0 {
        return Err(PipelineError::InvalidRequest(
            "ranking length must be at least 1".to_string(),
        ));
    }
    if options.histogram_bins == 0 {
        return Err(PipelineError::InvalidRequest(
            "histogram needs at least 1 bin".to_string(),
        ));
    }

    let table = view.table();
    let grouping = resolve_grouping_key(table, &metrics.category_column)?;
    let columns = MetricColumns::read(table, metrics)?;
    let keys = group_keys(table, &grouping)?;

    let grouped = sum_by_group(&keys, &columns);
    let top = top_n(&grouped, options.top_n);
    let result = AggregationResult {
        correlation: correlation_matrix(view),
        summary: summary_of(view.len(), &columns),
        trend: trend_of(table, &columns)?,
        yearly: yearly_of(table, &keys, &columns)?,
        distribution: distribution::distribution_of(&keys, &columns.amount),
        histogram: distribution::histogram_of(&columns.amount, options.histogram_bins),
        preview: preview(view),
        grouping,
        grouped,
        top,
    };

    tracing::debug!(
        table = table.name(),
        rows = view.len(),
        groups = result.grouped.len(),
        key = %result.grouping.column,
        "aggregation computed"
    );
    Ok(result)
}
