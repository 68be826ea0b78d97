//! Model training module
//!
//! Covers everything between a loaded table and a fitted model: feature
//! extraction with mean imputation, the seeded train/test split, the
//! random-forest learner, and evaluation metrics.

mod config;
mod metrics;
mod model;
mod trainer;

pub mod forest;
pub mod tree;

pub use config::TrainConfig;
pub use forest::{MaxFeatures, RandomForest};
pub use metrics::{
    AverageScores, ClassScores, ClassificationMetrics, ClassificationReport, ConfusionMatrix,
    Metrics, RegressionMetrics,
};
pub use model::{Prediction, TrainedModel};
pub use trainer::{TrainReport, Trainer};
pub use tree::{Criterion, DecisionTree, TreeNode};
