//! Pairwise Pearson correlation

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::is_numeric_dtype;
use crate::error::Result;

/// Pearson correlation over the numeric columns of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]` = correlation of `columns[i]` with `columns[j]`
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Look up a coefficient by column names
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Pairwise Pearson correlation over all numeric columns.
///
/// Each pair is computed over the rows where both values are present.
/// Pairs with fewer than two such rows, or where either side has no
/// variance, come out as NaN.
pub fn correlation(df: &DataFrame) -> Result<CorrelationMatrix> {
    let mut names = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = Vec::new();

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        if !is_numeric_dtype(series.dtype()) {
            continue;
        }
        let casted = series.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = casted.f64()?.into_iter().collect();
        names.push(column.name().to_string());
        columns.push(values);
    }

    let k = names.len();
    let mut values = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pairwise_pearson(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: names,
        values,
    })
}

/// Pearson r over rows where both values are present and finite.
fn pairwise_pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    let denom = (sum_xx * sum_yy).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    sum_xy / denom
}
