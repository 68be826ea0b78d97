//! Dataset bundle and task-type detection

use std::fmt;
use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RisklabError};

use super::loader::DataLoader;

/// Kind of ML task implied by the target column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// Discrete class labels
    Classification,
    /// Continuous target
    Regression,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Classification => write!(f, "classification"),
            TaskType::Regression => write!(f, "regression"),
        }
    }
}

/// Decide whether the target column calls for classification or regression.
///
/// Classification requires at most 10 distinct non-missing values, every
/// one of them rendering as a plain digit string. The test is deliberately
/// strict: negative labels and float-typed labels never count as digit
/// strings, so `-1` or `1.0` targets select regression.
pub fn detect_task_type(df: &DataFrame, target: &str) -> Result<TaskType> {
    let column = df
        .column(target)
        .map_err(|_| RisklabError::MissingColumn(target.to_string()))?;

    let distinct = column.as_materialized_series().drop_nulls().unique()?;

    let task = if distinct.len() <= 10 && values_are_digit_strings(&distinct)? {
        TaskType::Classification
    } else {
        TaskType::Regression
    };
    debug!(column = %target, distinct = distinct.len(), task = %task, "detected task type");
    Ok(task)
}

/// True when every value's rendered form is nothing but ASCII digits.
/// Vacuously true for an empty series.
fn values_are_digit_strings(values: &Series) -> Result<bool> {
    let ok = match values.dtype() {
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => true,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let casted = values.cast(&DataType::Int64)?;
            let all_non_negative = casted.i64()?.into_iter().flatten().all(|v| v >= 0);
            all_non_negative
        }
        DataType::String => {
            let ca = values.str()?;
            ca.into_iter()
                .flatten()
                .all(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        }
        // floats render with a decimal point, booleans as true/false
        _ => values.is_empty(),
    };
    Ok(ok)
}

/// Dtypes analytics and training read as numeric. Booleans count and
/// cast to 0/1 downstream; the describe-style summary excludes them
/// separately.
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

/// Shape, nulls, and cardinality of one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub nulls: usize,
    pub distinct: usize,
}

/// A loaded table bound to its target column and detected task type.
///
/// The bundle is immutable after construction; replacing the data means
/// constructing a new `Dataset`.
#[derive(Debug, Clone)]
pub struct Dataset {
    df: DataFrame,
    target: String,
    task: TaskType,
}

impl Dataset {
    /// Bundle an already-loaded frame with its detected task type.
    pub fn from_df(df: DataFrame, target: impl Into<String>) -> Result<Self> {
        let target = target.into();
        let task = detect_task_type(&df, &target)?;
        Ok(Self { df, target, task })
    }

    /// Load a CSV file from disk and detect the task.
    pub fn from_csv_path(path: impl AsRef<Path>, target: impl Into<String>) -> Result<Self> {
        let df = DataLoader::new().load_csv(path)?;
        Self::from_df(df, target)
    }

    /// Parse uploaded CSV bytes and detect the task.
    pub fn from_csv_bytes(bytes: &[u8], target: impl Into<String>) -> Result<Self> {
        let df = DataLoader::new().load_csv_bytes(bytes)?;
        Self::from_df(df, target)
    }

    /// Load from the uploaded buffer when present, the default path
    /// otherwise.
    pub fn load(
        uploaded: Option<&[u8]>,
        default_path: impl AsRef<Path>,
        target: impl Into<String>,
    ) -> Result<Self> {
        let df = DataLoader::new().load(uploaded, default_path)?;
        Self::from_df(df, target)
    }

    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn task(&self) -> TaskType {
        self.task
    }

    pub fn n_rows(&self) -> usize {
        self.df.height()
    }

    pub fn n_cols(&self) -> usize {
        self.df.width()
    }

    /// Numeric columns other than the target, the default feature set.
    pub fn feature_candidates(&self) -> Vec<String> {
        self.df
            .get_columns()
            .iter()
            .filter(|c| c.name().as_str() != self.target && is_numeric_dtype(c.dtype()))
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Per-column profile used by the CLI info view.
    pub fn column_profiles(&self) -> Vec<ColumnProfile> {
        self.df
            .get_columns()
            .iter()
            .map(|c| ColumnProfile {
                name: c.name().to_string(),
                dtype: format!("{:?}", c.dtype()),
                nulls: c.null_count(),
                distinct: c.as_materialized_series().n_unique().unwrap_or(0),
            })
            .collect()
    }
}
