//! Data loading and task-type detection

mod dataset;
mod loader;

pub use dataset::{detect_task_type, ColumnProfile, Dataset, TaskType};
pub use loader::DataLoader;

pub(crate) use dataset::is_numeric_dtype;

/// Fallback dataset read when the caller supplies no file
pub const DEFAULT_DATA_PATH: &str = "./data/high.csv";

/// Name of the prediction target column
pub const DEFAULT_TARGET: &str = "Risk";
