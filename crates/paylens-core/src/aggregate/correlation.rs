use serde::Serialize;

use crate::filter::FilteredView;
use crate::value::as_number;

/// Pearson correlation between every pair of numeric columns.
///
/// Undefined entries are `NaN` and serialize as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    fn empty() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Correlation between two columns by name.
    pub fn get(&self, left: &str, right: &str) -> Option<f64> {
        let row = self.columns.iter().position(|name| name == left)?;
        let column = self.columns.iter().position(|name| name == right)?;
        Some(self.values[row][column])
    }
}

/// Correlate every pair of `Integer`/`Float` columns of the slice.
///
/// Each pair uses the rows where both cells are numbers. A pair with fewer
/// than two such rows, or where either side is constant, is `NaN`. The matrix
/// is empty when the slice has no rows or fewer than two numeric columns.
pub fn correlation_matrix(view: &FilteredView) -> CorrelationMatrix {
    let table = view.table();
    let numeric = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| column.kind.is_numeric())
        .map(|(index, column)| {
            let cells = table
                .rows()
                .iter()
                .map(|row| as_number(&row[index]))
                .collect::<Vec<_>>();
            (column.name.clone(), cells)
        })
        .collect::<Vec<_>>();

    if numeric.len() < 2 || table.is_empty() {
        return CorrelationMatrix::empty();
    }

    let size = numeric.len();
    let mut values = vec![vec![f64::NAN; size]; size];
    for left in 0..size {
        for right in left..size {
            let mut value = pearson(&numeric[left].1, &numeric[right].1);
            if left == right && !value.is_nan() {
                value = 1.0;
            }
            values[left][right] = value;
            values[right][left] = value;
        }
    }

    CorrelationMatrix {
        columns: numeric.into_iter().map(|(name, _)| name).collect(),
        values,
    }
}

fn pearson(left: &[Option<f64>], right: &[Option<f64>]) -> f64 {
    let pairs = left
        .iter()
        .zip(right)
        .filter_map(|(left, right)| Some(((*left)?, (*right)?)))
        .collect::<Vec<_>>();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    // Constant means NaN, even when rounding in the mean leaves a variance.
    let (first_left, first_right) = pairs[0];
    if pairs.iter().all(|(left, _)| *left == first_left)
        || pairs.iter().all(|(_, right)| *right == first_right)
    {
        return f64::NAN;
    }

    let count = pairs.len() as f64;
    let mean_left = pairs.iter().map(|(value, _)| value).sum::<f64>() / count;
    let mean_right = pairs.iter().map(|(_, value)| value).sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance_left = 0.0;
    let mut variance_right = 0.0;
    for (left, right) in &pairs {
        let delta_left = left - mean_left;
        let delta_right = right - mean_right;
        covariance += delta_left * delta_right;
        variance_left += delta_left * delta_left;
        variance_right += delta_right * delta_right;
    }

    if variance_left == 0.0 || variance_right == 0.0 {
        return f64::NAN;
    }
    (covariance / (variance_left * variance_right).sqrt()).clamp(-1.0, 1.0)
}
