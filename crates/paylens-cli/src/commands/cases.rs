use paylens_core::CaseStudy;
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CaseStudyEntry {
    slug: &'static str,
    title: &'static str,
    table: &'static str,
    category_column: String,
    count_metric: String,
    amount_metric: String,
}

pub fn run() -> Result<CommandResult, CliError> {
    let cases = CaseStudy::ALL
        .into_iter()
        .map(|case| {
            let binding = case.binding();
            CaseStudyEntry {
                slug: case.slug(),
                title: case.title(),
                table: binding.table,
                category_column: binding.metrics.category_column,
                count_metric: binding.metrics.count_metric,
                amount_metric: binding.metrics.amount_metric,
            }
        })
        .collect::<Vec<_>>();

    Ok(CommandResult::ok(serde_json::to_value(cases)?))
}
