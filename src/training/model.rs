//! Trained model state and single-record prediction

use std::collections::HashMap;
use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::data::TaskType;
use crate::error::{Result, RisklabError};

use super::forest::RandomForest;

/// A fitted model bound to the feature columns it was trained on.
///
/// Holds everything a prediction needs, so it keeps working unchanged
/// even after the session's table is replaced.
#[derive(Debug, Clone)]
pub enum TrainedModel {
    Classifier {
        forest: RandomForest,
        features: Vec<String>,
    },
    Regressor {
        forest: RandomForest,
        features: Vec<String>,
    },
}

/// Outcome of a single-record prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    /// Class label (classification)
    Label(i64),
    /// Continuous value (regression)
    Value(f64),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Label(label) => write!(f, "{}", label),
            Prediction::Value(value) => write!(f, "{:.4}", value),
        }
    }
}

impl TrainedModel {
    pub fn task(&self) -> TaskType {
        match self {
            TrainedModel::Classifier { .. } => TaskType::Classification,
            TrainedModel::Regressor { .. } => TaskType::Regression,
        }
    }

    /// Feature columns in training order
    pub fn features(&self) -> &[String] {
        match self {
            TrainedModel::Classifier { features, .. }
            | TrainedModel::Regressor { features, .. } => features,
        }
    }

    pub fn forest(&self) -> &RandomForest {
        match self {
            TrainedModel::Classifier { forest, .. }
            | TrainedModel::Regressor { forest, .. } => forest,
        }
    }

    /// Predict one record given feature name to value pairs.
    ///
    /// Every trained feature must be present; keys beyond the trained
    /// features are ignored. The model itself is never mutated.
    pub fn predict(&self, values: &HashMap<String, f64>) -> Result<Prediction> {
        let features = self.features();
        let mut row = Vec::with_capacity(features.len());
        for name in features {
            let value = values
                .get(name)
                .ok_or_else(|| RisklabError::MissingFeature(name.clone()))?;
            row.push(*value);
        }
        let row = Array1::from_vec(row);
        let raw = self.forest().predict_row(row.view())?;

        Ok(match self {
            TrainedModel::Classifier { .. } => Prediction::Label(raw.round() as i64),
            TrainedModel::Regressor { .. } => Prediction::Value(raw),
        })
    }

    /// Feature importances paired with names, sorted descending
    pub fn feature_importances(&self) -> Result<Vec<(String, f64)>> {
        let importances = self
            .forest()
            .feature_importances()
            .ok_or(RisklabError::NotTrained)?;
        let mut pairs: Vec<(String, f64)> = self
            .features()
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(pairs)
    }
}
