//! Head rows and describe-style summary statistics

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::is_numeric_dtype;
use crate::error::{Result, RisklabError};

/// Rows shown in the overview head
const HEAD_ROWS: usize = 20;

/// Leading rows plus per-column summary statistics
#[derive(Debug, Clone)]
pub struct Overview {
    /// First rows of the table, at most 20
    pub head: DataFrame,
    /// One row per statistic, one column per numeric input column
    pub summary: DataFrame,
}

/// Summary statistics of one numeric column.
///
/// Sample standard deviation (n - 1 denominator) and linear-interpolated
/// quartiles, computed over non-missing values only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// None when the series is not numeric, is boolean, or holds no
    /// values. Booleans correlate as 0/1 but get no describe row.
    pub fn from_series(series: &Series) -> Option<ColumnSummary> {
        if !is_numeric_dtype(series.dtype()) || series.dtype() == &DataType::Boolean {
            return None;
        }
        let casted = series.cast(&DataType::Float64).ok()?;
        let ca = casted.f64().ok()?;
        let mut values: Vec<f64> = ca.into_iter().flatten().filter(|v| !v.is_nan()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let count = values.len();
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if count > 1 {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        } else {
            f64::NAN
        };

        Some(ColumnSummary {
            name: series.name().to_string(),
            count,
            mean,
            std,
            min: values[0],
            q25: quantile_sorted(&values, 0.25),
            median: quantile_sorted(&values, 0.5),
            q75: quantile_sorted(&values, 0.75),
            max: values[count - 1],
        })
    }
}

/// Linear-interpolated quantile of an ascending-sorted slice.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
    }
}

/// Summary statistics for every numeric column of the frame.
pub fn column_summaries(df: &DataFrame) -> Result<Vec<ColumnSummary>> {
    let summaries: Vec<ColumnSummary> = df
        .get_columns()
        .iter()
        .filter_map(|c| ColumnSummary::from_series(c.as_materialized_series()))
        .collect();
    if summaries.is_empty() {
        return Err(RisklabError::InsufficientData(
            "no numeric columns to summarize".to_string(),
        ));
    }
    Ok(summaries)
}

/// First rows of the table plus a describe-style statistics frame.
pub fn overview(df: &DataFrame) -> Result<Overview> {
    let head = df.head(Some(HEAD_ROWS));
    let summaries = column_summaries(df)?;
    Ok(Overview {
        head,
        summary: summary_frame(&summaries)?,
    })
}

fn summary_frame(summaries: &[ColumnSummary]) -> Result<DataFrame> {
    let labels = Column::new(
        "statistic".into(),
        &["count", "mean", "std", "min", "25%", "50%", "75%", "max"],
    );
    let mut columns = vec![labels];
    for s in summaries {
        columns.push(Column::new(
            s.name.as_str().into(),
            &[
                s.count as f64,
                s.mean,
                s.std,
                s.min,
                s.q25,
                s.median,
                s.q75,
                s.max,
            ],
        ));
    }
    DataFrame::new(columns).map_err(Into::into)
}
