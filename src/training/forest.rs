//! Random forest of CART trees
//!
//! Trees grow in parallel, each from its own `ChaCha8Rng` seeded with
//! `seed + tree_index`, so results are identical across runs and across
//! thread counts for a fixed seed.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, RisklabError};

use super::tree::{Criterion, DecisionTree};

/// Strategy for the number of features tried at each split
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of the feature count
    Sqrt,
    /// Log2 of the feature count
    Log2,
    /// Fraction of the feature count
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let n = match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features)
    }
}

/// Random forest model.
///
/// [`RandomForest::classifier`] grows gini trees with sqrt feature
/// sampling and predicts by majority vote; [`RandomForest::regressor`]
/// grows variance trees over all features and predicts the tree mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Number of trees grown at fit time
    pub n_trees: usize,
    /// Maximum depth per tree (None = unlimited)
    pub max_depth: Option<usize>,
    /// Minimum samples required to attempt a split
    pub min_samples_split: usize,
    /// Minimum samples each side of a split must keep
    pub min_samples_leaf: usize,
    /// Features tried at each split
    pub max_features: MaxFeatures,
    /// Draw each tree's rows with replacement
    pub bootstrap: bool,
    /// Seed for bootstrap and feature sampling
    pub seed: u64,
    is_classification: bool,
    n_features: usize,
    classes: Vec<f64>,
    feature_importances: Option<Vec<f64>>,
}

impl RandomForest {
    /// Forest of classification trees
    pub fn classifier(n_trees: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_trees,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
            is_classification: true,
            n_features: 0,
            classes: Vec::new(),
            feature_importances: None,
        }
    }

    /// Forest of regression trees
    pub fn regressor(n_trees: usize) -> Self {
        Self {
            max_features: MaxFeatures::All,
            is_classification: false,
            ..Self::classifier(n_trees)
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the forest.
    pub fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(RisklabError::Shape {
                expected: format!("{} target values", n_samples),
                actual: format!("{}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(RisklabError::InsufficientData(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if n_features == 0 {
            return Err(RisklabError::Shape {
                expected: "at least one feature column".to_string(),
                actual: "0".to_string(),
            });
        }
        if self.n_trees == 0 {
            return Err(RisklabError::InvalidParameter {
                name: "n_trees".to_string(),
                value: "0".to_string(),
                reason: "the forest needs at least one tree".to_string(),
            });
        }

        self.n_features = n_features;
        let max_features = self.max_features.resolve(n_features);

        if self.is_classification {
            let mut classes: Vec<f64> = y.iter().copied().collect();
            classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            classes.dedup();
            self.classes = classes;
        }

        let criterion = if self.is_classification {
            Criterion::Gini
        } else {
            Criterion::Variance
        };

        let trees = (0..self.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let tree_seed = self.seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(tree_seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();

                let mut tree = DecisionTree::new(criterion)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features);
                if let Some(depth) = self.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                tree.fit(x_boot.view(), y_boot.view(), &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<Vec<DecisionTree>>>()?;

        self.trees = trees;
        self.feature_importances = Some(self.average_importances());
        Ok(self)
    }

    /// Predict a single row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(RisklabError::NotTrained);
        }
        if row.len() != self.n_features {
            return Err(RisklabError::Shape {
                expected: format!("{} feature values", self.n_features),
                actual: format!("{}", row.len()),
            });
        }

        if self.is_classification {
            // BTreeMap iterates keys ascending, so the strict > below
            // resolves vote ties toward the smallest label
            let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
            for tree in &self.trees {
                let label = tree.predict_row(row)?.round() as i64;
                *votes.entry(label).or_insert(0) += 1;
            }
            let mut best: Option<(i64, usize)> = None;
            for (label, count) in votes {
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((label, count));
                }
            }
            Ok(best.map_or(0.0, |(label, _)| label as f64))
        } else {
            let mut sum = 0.0;
            for tree in &self.trees {
                sum += tree.predict_row(row)?;
            }
            Ok(sum / self.trees.len() as f64)
        }
    }

    /// Predict every row of a matrix.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(RisklabError::NotTrained);
        }
        let mut out = Vec::with_capacity(x.nrows());
        for i in 0..x.nrows() {
            out.push(self.predict_row(x.row(i))?);
        }
        Ok(Array1::from_vec(out))
    }

    /// Importance per feature averaged over trees, normalized to sum to 1
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    /// Distinct training labels, sorted ascending; empty for regression
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn average_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(importances) = tree.feature_importances() {
                for (slot, &value) in totals.iter_mut().zip(importances) {
                    *slot += value;
                }
            }
        }
        let n_trees = self.trees.len() as f64;
        for value in &mut totals {
            *value /= n_trees;
        }
        let total: f64 = totals.iter().sum();
        if total > 0.0 {
            for value in &mut totals {
                *value /= total;
            }
        }
        totals
    }
}
