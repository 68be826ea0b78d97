//! Histogram of a numeric column

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RisklabError};

/// Bins used for the target histogram
const TARGET_BINS: usize = 20;

/// Uniform-width histogram over one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    pub column: String,
    /// Bin boundaries, one more than `counts`
    pub edges: Vec<f64>,
    /// Occupancy per bin; the final bin is closed on the right
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Histogram of the target column with 20 uniform bins.
pub fn target_distribution(df: &DataFrame, target: &str) -> Result<Histogram> {
    histogram(df, target, TARGET_BINS)
}

/// Uniform-width histogram of a column. Missing values are skipped; a
/// constant column collapses into a single degenerate bin.
pub fn histogram(df: &DataFrame, column: &str, n_bins: usize) -> Result<Histogram> {
    if n_bins == 0 {
        return Err(RisklabError::InvalidParameter {
            name: "n_bins".to_string(),
            value: "0".to_string(),
            reason: "a histogram needs at least one bin".to_string(),
        });
    }

    let series = df
        .column(column)
        .map_err(|_| RisklabError::MissingColumn(column.to_string()))?
        .as_materialized_series();
    let casted = series.cast(&DataType::Float64)?;
    let values: Vec<f64> = casted
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect();

    if values.is_empty() {
        return Err(RisklabError::InsufficientData(format!(
            "column '{}' has no numeric values to bin",
            column
        )));
    }

    let min_val = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_val = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min_val == max_val {
        return Ok(Histogram {
            column: column.to_string(),
            edges: vec![min_val, max_val],
            counts: vec![values.len()],
        });
    }

    let step = (max_val - min_val) / n_bins as f64;
    let edges: Vec<f64> = (0..=n_bins).map(|i| min_val + i as f64 * step).collect();

    let mut counts = vec![0usize; n_bins];
    for value in values {
        let mut bin = ((value - min_val) / step) as usize;
        if bin >= n_bins {
            // the maximum lands on the far edge
            bin = n_bins - 1;
        }
        counts[bin] += 1;
    }

    Ok(Histogram {
        column: column.to_string(),
        edges,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_distribution_bins_and_total() {
        let df = df!("Risk" => &[0i64, 1, 0, 1, 0, 1, 0, 1, 0, 1]).unwrap();
        let hist = target_distribution(&df, "Risk").unwrap();

        assert_eq!(hist.n_bins(), 20);
        assert_eq!(hist.edges.len(), 21);
        assert_eq!(hist.total(), 10);
        // zeros in the first bin, ones in the last
        assert_eq!(hist.counts[0], 5);
        assert_eq!(hist.counts[19], 5);
    }

    #[test]
    fn test_histogram_uniform_edges() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let df = df!("V" => &values).unwrap();
        let hist = histogram(&df, "V", 10).unwrap();

        assert_eq!(hist.edges[0], 0.0);
        assert!((hist.edges[10] - 99.0).abs() < 1e-9);
        assert_eq!(hist.total(), 100);
        let width = hist.edges[1] - hist.edges[0];
        for w in hist.edges.windows(2) {
            assert!((w[1] - w[0] - width).abs() < 1e-9);
        }
    }

    #[test]
    fn test_histogram_constant_column() {
        let df = df!("V" => &[5.0f64, 5.0, 5.0]).unwrap();
        let hist = histogram(&df, "V", 20).unwrap();
        assert_eq!(hist.n_bins(), 1);
        assert_eq!(hist.counts[0], 3);
        assert_eq!(hist.edges, vec![5.0, 5.0]);
    }

    #[test]
    fn test_histogram_skips_nulls() {
        let df = df!("V" => &[Some(1.0f64), None, Some(2.0), None]).unwrap();
        let hist = histogram(&df, "V", 4).unwrap();
        assert_eq!(hist.total(), 2);
    }

    #[test]
    fn test_histogram_missing_column() {
        let df = df!("V" => &[1.0f64]).unwrap();
        let err = histogram(&df, "W", 10).unwrap_err();
        assert!(matches!(err, RisklabError::MissingColumn(_)));
    }

    #[test]
    fn test_histogram_zero_bins() {
        let df = df!("V" => &[1.0f64, 2.0]).unwrap();
        let err = histogram(&df, "V", 0).unwrap_err();
        assert!(matches!(err, RisklabError::InvalidParameter { .. }));
    }
}
