//! Training pipeline: imputation, split, fit, evaluate

use std::collections::BTreeMap;
use std::time::Instant;

use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::data::{Dataset, TaskType};
use crate::error::{Result, RisklabError};

use super::config::TrainConfig;
use super::forest::RandomForest;
use super::metrics::{ClassificationMetrics, Metrics, RegressionMetrics};
use super::model::TrainedModel;

/// Runs the training pipeline described by a [`TrainConfig`] against a
/// [`Dataset`], producing a [`TrainReport`].
pub struct Trainer {
    config: TrainConfig,
}

/// Everything a successful training run produces
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub model: TrainedModel,
    pub metrics: Metrics,
    pub n_train: usize,
    pub n_test: usize,
    pub training_time_secs: f64,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Run the full pipeline: validate, impute, split, fit, evaluate.
    ///
    /// Feature means are computed over every row of the table before the
    /// split, and missing target values are rejected outright.
    pub fn fit(&self, data: &Dataset) -> Result<TrainReport> {
        let start = Instant::now();

        self.config.validate()?;
        self.check_features(data)?;

        let x = impute_feature_matrix(data.df(), &self.config.features)?;
        let y = extract_target(data.df(), data.target())?;

        if data.task() == TaskType::Classification {
            check_class_support(&y)?;
        }

        let (train_idx, test_idx) =
            split_indices(x.nrows(), self.config.test_fraction, self.config.random_seed)?;

        let x_train = x.select(Axis(0), &train_idx);
        let y_train: Array1<f64> = train_idx.iter().map(|&i| y[i]).collect();
        let x_test = x.select(Axis(0), &test_idx);
        let y_test: Array1<f64> = test_idx.iter().map(|&i| y[i]).collect();

        info!(
            task = %data.task(),
            n_train = train_idx.len(),
            n_test = test_idx.len(),
            n_features = self.config.features.len(),
            "fitting random forest"
        );

        let (model, metrics) = match data.task() {
            TaskType::Classification => {
                let mut forest = RandomForest::classifier(self.config.n_trees)
                    .with_seed(self.config.random_seed);
                forest.fit(x_train.view(), y_train.view())?;

                let y_pred = forest.predict(x_test.view())?;
                let true_labels: Vec<i64> = y_test.iter().map(|v| v.round() as i64).collect();
                let pred_labels: Vec<i64> = y_pred.iter().map(|v| v.round() as i64).collect();
                let class_labels: Vec<i64> =
                    forest.classes().iter().map(|v| v.round() as i64).collect();

                let metrics = Metrics::Classification(ClassificationMetrics::compute(
                    &true_labels,
                    &pred_labels,
                    &class_labels,
                ));
                let model = TrainedModel::Classifier {
                    forest,
                    features: self.config.features.clone(),
                };
                (model, metrics)
            }
            TaskType::Regression => {
                let mut forest = RandomForest::regressor(self.config.n_trees)
                    .with_seed(self.config.random_seed);
                forest.fit(x_train.view(), y_train.view())?;

                let y_pred = forest.predict(x_test.view())?;
                let metrics =
                    Metrics::Regression(RegressionMetrics::compute(y_test.view(), y_pred.view()));
                let model = TrainedModel::Regressor {
                    forest,
                    features: self.config.features.clone(),
                };
                (model, metrics)
            }
        };

        let training_time_secs = start.elapsed().as_secs_f64();
        debug!(secs = training_time_secs, "training finished");

        Ok(TrainReport {
            model,
            metrics,
            n_train: train_idx.len(),
            n_test: test_idx.len(),
            training_time_secs,
        })
    }

    fn check_features(&self, data: &Dataset) -> Result<()> {
        for name in &self.config.features {
            if name == data.target() {
                return Err(RisklabError::InvalidParameter {
                    name: "features".to_string(),
                    value: name.clone(),
                    reason: "the target column cannot be used as a feature".to_string(),
                });
            }
            if data.df().column(name).is_err() {
                return Err(RisklabError::MissingColumn(name.clone()));
            }
        }
        Ok(())
    }
}

impl TrainReport {
    /// Human-readable training report
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Training Report ===\n\n");
        out.push_str(&format!("Task:       {}\n", self.model.task()));
        out.push_str(&format!("Trees:      {}\n", self.model.forest().n_trees));
        out.push_str(&format!("Train rows: {}\n", self.n_train));
        out.push_str(&format!("Test rows:  {}\n", self.n_test));
        out.push_str(&format!("Time:       {:.3}s\n\n", self.training_time_secs));

        match &self.metrics {
            Metrics::Classification(m) => {
                out.push_str(&format!("Accuracy: {:.4}\n\n", m.accuracy));
                out.push_str("--- Confusion Matrix ---\n");
                out.push_str(&m.confusion.to_string());
                out.push('\n');
                out.push_str("--- Classification Report ---\n");
                out.push_str(&m.report.to_string());
                out.push('\n');
            }
            Metrics::Regression(m) => {
                out.push_str(&format!("MSE: {:.4}\n", m.mse));
                out.push_str(&format!("R2:  {:.4}\n", m.r2));
            }
        }

        if let Ok(importances) = self.model.feature_importances() {
            out.push_str("\n--- Feature Importance ---\n");
            for (name, importance) in &importances {
                out.push_str(&format!("  {:<20} {:.4}\n", name, importance));
            }
        }

        out
    }
}

/// Extract feature columns as f64, replacing missing values with the
/// column mean computed over the full table.
fn impute_feature_matrix(df: &DataFrame, features: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = features.len();

    let col_data: Vec<Vec<f64>> = features
        .iter()
        .map(|name| {
            let series = df
                .column(name)
                .map_err(|_| RisklabError::MissingColumn(name.clone()))?
                .as_materialized_series();
            let casted = series.cast(&DataType::Float64)?;
            let ca = casted.f64()?;
            let mean = ca.mean().ok_or_else(|| {
                RisklabError::InsufficientData(format!(
                    "feature '{}' has no usable numeric values",
                    name
                ))
            })?;
            let values: Vec<f64> = ca.into_iter().map(|v| v.unwrap_or(mean)).collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Target column as f64. Missing or non-numeric values are rejected
/// rather than imputed.
fn extract_target(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let series = df
        .column(target)
        .map_err(|_| RisklabError::MissingColumn(target.to_string()))?
        .as_materialized_series();
    let casted = series.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    if ca.null_count() > 0 {
        return Err(RisklabError::InsufficientData(format!(
            "target '{}' has {} missing or non-numeric values",
            target,
            ca.null_count()
        )));
    }
    Ok(ca.into_iter().flatten().collect())
}

/// Every class needs at least two members for a meaningful fit.
fn check_class_support(y: &Array1<f64>) -> Result<()> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in y.iter() {
        *counts.entry(value.round() as i64).or_insert(0) += 1;
    }
    for (label, count) in counts {
        if count < 2 {
            return Err(RisklabError::InsufficientData(format!(
                "class {} has only {} member",
                label, count
            )));
        }
    }
    Ok(())
}

/// Seeded shuffle split. The test partition takes the first
/// `ceil(n_rows * test_fraction)` shuffled rows.
fn split_indices(n_rows: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_test = (n_rows as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(RisklabError::InsufficientData(format!(
            "{} rows cannot be split with test_fraction {}",
            n_rows, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test = indices[..n_test].to_vec();
    let train = indices[n_test..].to_vec();
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk_frame() -> Dataset {
        let df = df!(
            "Age" => &[34i64, 51, 29, 44, 61, 38, 55, 47, 33, 42],
            "Pressure" => &[118.0, 141.5, 110.2, 133.0, 150.8, 125.4, 139.9, 131.2, 116.7, 128.3],
            "Risk" => &[0i64, 1, 0, 1, 1, 0, 1, 1, 0, 0],
        )
        .unwrap();
        Dataset::from_df(df, "Risk").unwrap()
    }

    fn features() -> Vec<String> {
        vec!["Age".to_string(), "Pressure".to_string()]
    }

    #[test]
    fn test_fit_classification() {
        let data = risk_frame();
        let trainer = Trainer::new(TrainConfig::new(features()).with_n_trees(20));
        assert_eq!(trainer.config().n_trees, 20);
        let report = trainer.fit(&data).unwrap();

        assert_eq!(report.model.task(), TaskType::Classification);
        assert_eq!(report.n_train + report.n_test, 10);
        let accuracy = report.metrics.accuracy().unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_fit_regression() {
        let df = df!(
            "Age" => &[34i64, 51, 29, 44, 61, 38, 55, 47, 33, 42],
            "Risk" => &[1.1f64, 2.3, 0.4, 5.6, 3.3, 2.2, 1.0, 4.4, 3.1, 2.9],
        )
        .unwrap();
        let data = Dataset::from_df(df, "Risk").unwrap();

        let config = TrainConfig::new(vec!["Age".to_string()]).with_n_trees(20);
        let report = Trainer::new(config).fit(&data).unwrap();

        assert_eq!(report.model.task(), TaskType::Regression);
        assert!(report.metrics.mse().unwrap() >= 0.0);
        assert!(report.metrics.r2().unwrap() <= 1.0);
    }

    #[test]
    fn test_fit_rejects_target_as_feature() {
        let data = risk_frame();
        let config = TrainConfig::new(vec!["Age".to_string(), "Risk".to_string()]);
        let err = Trainer::new(config).fit(&data).unwrap_err();
        assert!(matches!(err, RisklabError::InvalidParameter { .. }));
    }

    #[test]
    fn test_fit_rejects_unknown_feature() {
        let data = risk_frame();
        let config = TrainConfig::new(vec!["Cholesterol".to_string()]);
        let err = Trainer::new(config).fit(&data).unwrap_err();
        assert!(matches!(err, RisklabError::MissingColumn(_)));
    }

    #[test]
    fn test_fit_rejects_singleton_class() {
        let df = df!(
            "Age" => &[34i64, 51, 29, 44, 61],
            "Risk" => &[0i64, 0, 0, 0, 1],
        )
        .unwrap();
        let data = Dataset::from_df(df, "Risk").unwrap();
        let err = Trainer::new(TrainConfig::new(vec!["Age".to_string()]))
            .fit(&data)
            .unwrap_err();
        assert!(matches!(err, RisklabError::InsufficientData(_)));
    }

    #[test]
    fn test_fit_rejects_missing_target_values() {
        let df = df!(
            "Age" => &[34i64, 51, 29, 44],
            "Risk" => &[Some(0i64), Some(1), None, Some(1)],
        )
        .unwrap();
        let data = Dataset::from_df(df, "Risk").unwrap();
        let err = Trainer::new(TrainConfig::new(vec!["Age".to_string()]))
            .fit(&data)
            .unwrap_err();
        assert!(matches!(err, RisklabError::InsufficientData(_)));
    }

    #[test]
    fn test_imputation_fills_column_mean() {
        let df = df!(
            "Age" => &[Some(10.0f64), None, Some(30.0), Some(20.0)],
        )
        .unwrap();
        let x = impute_feature_matrix(&df, &["Age".to_string()]).unwrap();
        // mean over present values = 20
        assert_eq!(x[[1, 0]], 20.0);
        assert_eq!(x[[0, 0]], 10.0);
    }

    #[test]
    fn test_split_is_seeded_and_exhaustive() {
        let (train_a, test_a) = split_indices(10, 0.2, 42).unwrap();
        let (train_b, test_b) = split_indices(10, 0.2, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 2);

        let mut all: Vec<usize> = train_a.iter().chain(test_a.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        let (_, test_c) = split_indices(10, 0.2, 43).unwrap();
        assert_ne!(test_a, test_c);
    }

    #[test]
    fn test_split_ceil_and_bounds() {
        // ceil(5 * 0.2) = 1 test row
        let (train, test) = split_indices(5, 0.2, 42).unwrap();
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 4);

        assert!(split_indices(1, 0.2, 42).is_err());
        assert!(split_indices(2, 0.9, 42).is_err());
    }

    #[test]
    fn test_deterministic_reports() {
        let data = risk_frame();
        let make = || {
            Trainer::new(
                TrainConfig::new(features())
                    .with_n_trees(10)
                    .with_random_seed(42),
            )
            .fit(&data)
            .unwrap()
        };
        let first = make();
        let second = make();
        assert_eq!(first.metrics.accuracy(), second.metrics.accuracy());

        let mut record = std::collections::HashMap::new();
        record.insert("Age".to_string(), 40.0);
        record.insert("Pressure".to_string(), 130.0);
        assert_eq!(
            first.model.predict(&record).unwrap(),
            second.model.predict(&record).unwrap()
        );
    }

    #[test]
    fn test_summary_renders() {
        let data = risk_frame();
        let report = Trainer::new(TrainConfig::new(features()).with_n_trees(10))
            .fit(&data)
            .unwrap();
        let summary = report.summary();
        assert!(summary.contains("Training Report"));
        assert!(summary.contains("Accuracy"));
        assert!(summary.contains("Confusion Matrix"));
        assert!(summary.contains("Feature Importance"));
    }
}
