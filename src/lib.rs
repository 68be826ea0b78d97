//! # risklab
//!
//! Core pipeline behind a health-risk dashboard. It loads a tabular
//! health dataset from CSV, infers whether the risk target calls for
//! classification or regression, trains a seeded random forest, and
//! serves single-record predictions alongside descriptive analytics.
//!
//! ## Modules
//!
//! - **data**: CSV loading (from disk or uploaded bytes) and task-type
//!   detection from the target column
//! - **training**: mean imputation, seeded train/test split, random
//!   forest, and evaluation metrics
//! - **analytics**: summary statistics, target histogram, correlation
//!   matrix, and scatter extraction
//! - **session**: the dataset and model state held by one interactive
//!   session
//!
//! ## Quick start
//!
//! ```no_run
//! use risklab::prelude::*;
//!
//! fn main() -> risklab::Result<()> {
//!     let dataset = Dataset::from_csv_path("./data/high.csv", "Risk")?;
//!     let config = TrainConfig::new(vec!["Age".to_string(), "Pressure".to_string()]);
//!     let report = Trainer::new(config).fit(&dataset)?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

// Core error handling
pub mod error;

// Core pipeline modules
pub mod analytics;
pub mod data;
pub mod training;

// Session state
pub mod session;

// CLI
pub mod cli;

pub use error::{Result, RisklabError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analytics::{
        column_summaries, correlation, histogram, overview, scatter, target_distribution,
        ColumnSummary, CorrelationMatrix, Histogram, Overview, ScatterData, ScatterPoint,
    };
    pub use crate::data::{DataLoader, Dataset, TaskType, DEFAULT_DATA_PATH, DEFAULT_TARGET};
    pub use crate::error::{Result, RisklabError};
    pub use crate::session::Session;
    pub use crate::training::{
        ClassificationMetrics, ConfusionMatrix, MaxFeatures, Metrics, Prediction,
        RandomForest, RegressionMetrics, TrainConfig, TrainReport, TrainedModel, Trainer,
    };
}
