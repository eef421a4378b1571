use paylens_core::{
    run_analysis, AggregateOptions, Analysis, AnalysisRequest, FilterSpec, MetricSpec, Store,
};
use serde::Serialize;

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

use super::CommandResult;

const EMPTY_SLICE_WARNING: &str = "no data available for the selected filters";

#[derive(Debug, Serialize)]
struct AnalyzeResponseData {
    case: &'static str,
    title: &'static str,
    analysis: Analysis,
}

pub fn run(args: &AnalyzeArgs, store: &Store) -> Result<CommandResult, CliError> {
    let request = build_request(args);
    let analysis = run_analysis(store, &request)?;
    let empty = analysis.is_empty();

    let data = serde_json::to_value(AnalyzeResponseData {
        case: args.case.slug(),
        title: args.case.title(),
        analysis,
    })?;

    let mut result = CommandResult::ok(data);
    if empty {
        result = result.with_warning(EMPTY_SLICE_WARNING);
    }
    if request.table != args.case.table() || request.metrics != args.case.binding().metrics {
        result = result.with_warning(format!(
            "case study binding overridden: table={}, category={}, count={}, amount={}",
            request.table,
            request.metrics.category_column,
            request.metrics.count_metric,
            request.metrics.amount_metric
        ));
    }
    Ok(result)
}

fn build_request(args: &AnalyzeArgs) -> AnalysisRequest {
    let binding = args.case.binding();
    let metrics = MetricSpec {
        category_column: args
            .category
            .clone()
            .unwrap_or(binding.metrics.category_column),
        count_metric: args
            .count_metric
            .clone()
            .unwrap_or(binding.metrics.count_metric),
        amount_metric: args
            .amount_metric
            .clone()
            .unwrap_or(binding.metrics.amount_metric),
    };

    let filter = FilterSpec {
        year: args.year,
        quarter: args.quarter,
        state: args.state.clone(),
    };

    AnalysisRequest::new(
        args.table.clone().unwrap_or_else(|| binding.table.to_string()),
        metrics,
    )
    .with_filter(filter)
    .with_options(AggregateOptions {
        top_n: args.top,
        histogram_bins: args.bins,
    })
}
