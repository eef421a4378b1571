use std::collections::BTreeMap;

use serde::Serialize;

use super::{group_keys, read_metric, GroupingKey};
use crate::filter::FilteredView;
use crate::value::GroupKey;
use crate::PipelineError;

/// Five-number summary of the amount metric within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub group: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// One equal-width bucket of the amount histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Box-plot statistics of `amount_metric` per group, in ascending group order.
///
/// Groups whose amounts are all NULL are left out.
pub fn amount_distribution(
    view: &FilteredView,
    key: &GroupingKey,
    amount_metric: &str,
) -> Result<Vec<GroupDistribution>, PipelineError> {
    let amounts = read_metric(view.table(), amount_metric)?;
    let keys = group_keys(view.table(), key)?;
    Ok(distribution_of(&keys, &amounts))
}

pub(super) fn distribution_of(keys: &[GroupKey], amounts: &[Option<f64>]) -> Vec<GroupDistribution> {
    let mut groups = BTreeMap::<&GroupKey, Vec<f64>>::new();
    for (key, amount) in keys.iter().zip(amounts) {
        if let Some(amount) = amount {
            groups.entry(key).or_default().push(*amount);
        }
    }

    groups
        .into_iter()
        .map(|(group, mut values)| {
            values.sort_by(f64::total_cmp);
            GroupDistribution {
                group: group.label(),
                count: values.len(),
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[values.len() - 1],
            }
        })
        .collect()
}

/// Quantile of sorted, non-empty `values` with linear interpolation between
/// the closest ranks.
fn quantile(values: &[f64], probability: f64) -> f64 {
    let position = probability * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    values[lower] + (values[upper] - values[lower]) * (position - lower as f64)
}

/// Equal-width histogram of `amount_metric` with `bins` buckets.
///
/// All-equal amounts collapse into a single bin; no amounts give no bins.
pub fn amount_histogram(
    view: &FilteredView,
    amount_metric: &str,
    bins: usize,
) -> Result<Vec<HistogramBin>, PipelineError> {
    let amounts = read_metric(view.table(), amount_metric)?;
    Ok(histogram_of(&amounts, bins))
}

pub(super) fn histogram_of(amounts: &[Option<f64>], bins: usize) -> Vec<HistogramBin> {
    let values = amounts.iter().flatten().copied().collect::<Vec<_>>();
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);

    if min == max || bins <= 1 {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut histogram = (0..bins)
        .map(|index| HistogramBin {
            lower: min + width * index as f64,
            upper: if index + 1 == bins {
                max
            } else {
                min + width * (index + 1) as f64
            },
            count: 0,
        })
        .collect::<Vec<_>>();

    for value in values {
        let index = (((value - min) / width).floor() as usize).min(bins - 1);
        histogram[index].count += 1;
    }
    histogram
}
