//! One full fetch → normalize → filter → aggregate cycle.

use paylens_warehouse::Store;
use serde::Serialize;

use crate::aggregate::{aggregate_with, AggregateOptions, AggregationResult, MetricSpec};
use crate::case_study::CaseStudy;
use crate::filter::{filter, FilterSpec};
use crate::normalize::{load_table, NormalizedTable};
use crate::PipelineError;

/// Everything one analysis needs: table, columns, slice and view options.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub table: String,
    pub metrics: MetricSpec,
    pub filter: FilterSpec,
    pub options: AggregateOptions,
}

impl AnalysisRequest {
    pub fn new(table: impl Into<String>, metrics: MetricSpec) -> Self {
        Self {
            table: table.into(),
            metrics,
            filter: FilterSpec::all(),
            options: AggregateOptions::default(),
        }
    }

    /// Request bound to a case study's table and columns.
    pub fn for_case(case: CaseStudy) -> Self {
        let binding = case.binding();
        Self::new(binding.table, binding.metrics)
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_options(mut self, options: AggregateOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub table: String,
    pub filter: FilterSpec,
    /// Rows in the table before filtering.
    pub total_rows: usize,
    /// Rows in the slice.
    pub matched_rows: usize,
    pub aggregation: AggregationResult,
}

impl Analysis {
    /// Whether the slice is empty. Empty slices are valid results.
    pub fn is_empty(&self) -> bool {
        self.matched_rows == 0
    }
}

/// Run the filter and aggregation over an already loaded table.
pub fn analyze_table(
    table: &NormalizedTable,
    request: &AnalysisRequest,
) -> Result<Analysis, PipelineError> {
    let view = filter(table, &request.filter)?;
    let aggregation = aggregate_with(&view, &request.metrics, request.options)?;

    Ok(Analysis {
        table: table.name().to_string(),
        filter: request.filter.clone(),
        total_rows: table.len(),
        matched_rows: view.len(),
        aggregation,
    })
}

/// Fetch the request's table and analyze it.
///
/// # Errors
/// Whatever [`load_table`], [`filter`] or [`aggregate_with`] reports.
pub fn run_analysis(store: &Store, request: &AnalysisRequest) -> Result<Analysis, PipelineError> {
    let table = load_table(store, &request.table)?;
    let analysis = analyze_table(&table, request)?;
    tracing::info!(
        table = %analysis.table,
        total_rows = analysis.total_rows,
        matched_rows = analysis.matched_rows,
        "analysis complete"
    );
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use paylens_warehouse::{ColumnKind, SqlColumn, StoreTable};
    use serde_json::json;

    fn insurance_table() -> NormalizedTable {
        let column = |name: &str, kind| SqlColumn {
            name: name.to_string(),
            r#type: String::from("ANY"),
            kind,
        };
        normalize(StoreTable {
            name: "agg_insur".to_string(),
            columns: vec![
                column("Year", ColumnKind::Integer),
                column("Quarter", ColumnKind::Integer),
                column("State", ColumnKind::Text),
                column("Insurance_Count", ColumnKind::Integer),
                column("Insurance_Amount", ColumnKind::Float),
            ],
            rows: vec![
                vec![json!(2022), json!(1), json!("goa"), json!(2), json!(20.0)],
                vec![json!(2022), json!(2), json!("kerala"), json!(3), json!(45.0)],
                vec![json!(2023), json!(1), json!("goa"), json!(4), json!(60.0)],
            ],
        })
    }

    #[test]
    fn case_study_request_analyzes_its_slice() {
        let request = AnalysisRequest::for_case(CaseStudy::InsuranceEngagement)
            .with_filter(FilterSpec::all().with_state("goa"));
        let analysis = analyze_table(&insurance_table(), &request).expect("analysis");

        assert_eq!(analysis.total_rows, 3);
        assert_eq!(analysis.matched_rows, 2);
        assert_eq!(analysis.aggregation.grouping.column, "state");
        assert!(!analysis.aggregation.grouping.fallback);
        assert_eq!(analysis.aggregation.summary.total_amount, 80.0);
        assert_eq!(analysis.aggregation.summary.mean_amount, Some(40.0));
    }

    #[test]
    fn empty_slice_is_a_result() {
        let request = AnalysisRequest::for_case(CaseStudy::InsuranceTransactions)
            .with_filter(FilterSpec::all().with_year(2030));
        let analysis = analyze_table(&insurance_table(), &request).expect("analysis");

        assert!(analysis.is_empty());
        assert_eq!(analysis.aggregation.summary.total_count, 0.0);
        assert_eq!(analysis.aggregation.summary.mean_amount, None);
    }

    #[test]
    fn wrong_table_for_metrics_fails() {
        let request = AnalysisRequest::for_case(CaseStudy::UserRegistration);
        let error = analyze_table(&insurance_table(), &request).expect_err("no app_opens");
        assert_eq!(error.code(), "missing_column");
    }
}
