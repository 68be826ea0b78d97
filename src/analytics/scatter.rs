//! Per-row scatter extraction

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RisklabError};

/// One plotted point
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Target value for coloring, when the row has one
    pub color: Option<f64>,
}

/// Scatter data for an x/y column pair colored by the target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterData {
    pub x_col: String,
    pub y_col: String,
    pub color_col: String,
    pub points: Vec<ScatterPoint>,
}

/// Collect per-row (x, y, color) triples for plotting.
///
/// Rows missing either coordinate are dropped; a missing target value
/// only blanks the point's color.
pub fn scatter(df: &DataFrame, x_col: &str, y_col: &str, target: &str) -> Result<ScatterData> {
    let xs = numeric_values(df, x_col)?;
    let ys = numeric_values(df, y_col)?;
    let colors = numeric_values(df, target)?;

    let points = xs
        .into_iter()
        .zip(ys)
        .zip(colors)
        .filter_map(|((x, y), color)| match (x, y) {
            (Some(x), Some(y)) => Some(ScatterPoint { x, y, color }),
            _ => None,
        })
        .collect();

    Ok(ScatterData {
        x_col: x_col.to_string(),
        y_col: y_col.to_string(),
        color_col: target.to_string(),
        points,
    })
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|_| RisklabError::MissingColumn(name.to_string()))?
        .as_materialized_series();
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}
