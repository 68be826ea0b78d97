//! Session-held dataset and model state

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::data::{Dataset, DEFAULT_TARGET};
use crate::error::{Result, RisklabError};
use crate::training::{Metrics, Prediction, TrainConfig, TrainReport, TrainedModel, Trainer};

/// Owns the loaded table and the trained model for one interactive
/// session.
///
/// State only ever changes by replacement: loading swaps in a whole new
/// dataset and a successful train swaps in a whole new model. A failed
/// train leaves the previous model untouched, and a model trained against
/// an earlier table keeps predicting after a reload because everything it
/// needs lives in its fitted trees.
pub struct Session {
    target: String,
    dataset: Option<Dataset>,
    model: Option<TrainedModel>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session predicting the default "Risk" target
    pub fn new() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            dataset: None,
            model: None,
        }
    }

    /// Override the target column name
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    /// Load a CSV file from disk, replacing any held dataset.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<&Dataset> {
        let dataset = Dataset::from_csv_path(path, self.target.clone())?;
        info!(rows = dataset.n_rows(), task = %dataset.task(), "session dataset replaced");
        Ok(self.dataset.insert(dataset))
    }

    /// Parse uploaded CSV bytes, replacing any held dataset.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<&Dataset> {
        let dataset = Dataset::from_csv_bytes(bytes, self.target.clone())?;
        info!(rows = dataset.n_rows(), task = %dataset.task(), "session dataset replaced");
        Ok(self.dataset.insert(dataset))
    }

    /// Train on the held dataset. The session's model is replaced only
    /// when training succeeds; any error leaves it as it was.
    pub fn train(&mut self, config: TrainConfig) -> Result<Metrics> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| RisklabError::InsufficientData("no dataset loaded".to_string()))?;

        let TrainReport { model, metrics, .. } = Trainer::new(config).fit(dataset)?;
        info!(task = %model.task(), "session model replaced");
        self.model = Some(model);
        Ok(metrics)
    }

    /// Predict one record with the session's model.
    pub fn predict(&self, values: &HashMap<String, f64>) -> Result<Prediction> {
        let model = self.model.as_ref().ok_or(RisklabError::NotTrained)?;
        model.predict(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn seeded_session() -> Session {
        let df = df!(
            "Age" => &[34i64, 51, 29, 44, 61, 38, 55, 47, 33, 42],
            "Risk" => &[0i64, 1, 0, 1, 1, 0, 1, 1, 0, 0],
        )
        .unwrap();
        let mut session = Session::new();
        session.dataset = Some(Dataset::from_df(df, "Risk").unwrap());
        session
    }

    fn age_config() -> TrainConfig {
        TrainConfig::new(vec!["Age".to_string()]).with_n_trees(10)
    }

    #[test]
    fn test_predict_before_train() {
        let session = seeded_session();
        let err = session.predict(&HashMap::new()).unwrap_err();
        assert!(matches!(err, RisklabError::NotTrained));
    }

    #[test]
    fn test_train_then_predict() {
        let mut session = seeded_session();
        let metrics = session.train(age_config()).unwrap();
        assert!(metrics.accuracy().is_some());

        let mut record = HashMap::new();
        record.insert("Age".to_string(), 50.0);
        let pred = session.predict(&record).unwrap();
        assert!(matches!(pred, Prediction::Label(_)));
    }

    #[test]
    fn test_failed_train_keeps_model() {
        let mut session = seeded_session();
        session.train(age_config()).unwrap();

        let bad = TrainConfig::new(vec!["Cholesterol".to_string()]);
        assert!(session.train(bad).is_err());

        // the first model survives and still answers
        let mut record = HashMap::new();
        record.insert("Age".to_string(), 50.0);
        assert!(session.predict(&record).is_ok());
        assert_eq!(session.model().unwrap().features(), &["Age".to_string()]);
    }

    #[test]
    fn test_model_survives_dataset_replacement() {
        let mut session = seeded_session();
        session.train(age_config()).unwrap();

        let replacement = df!(
            "Weight" => &[70.0f64, 82.5, 64.1],
            "Risk" => &[0i64, 1, 0],
        )
        .unwrap();
        session.dataset = Some(Dataset::from_df(replacement, "Risk").unwrap());

        let mut record = HashMap::new();
        record.insert("Age".to_string(), 50.0);
        assert!(session.predict(&record).is_ok());
    }

    #[test]
    fn test_train_without_dataset() {
        let mut session = Session::new();
        assert_eq!(session.target(), "Risk");
        let err = session.train(age_config()).unwrap_err();
        assert!(matches!(err, RisklabError::InsufficientData(_)));
    }

    #[test]
    fn test_target_override() {
        let session = Session::new().with_target("Outcome");
        assert_eq!(session.target(), "Outcome");
    }
}
