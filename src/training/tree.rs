//! CART decision tree, the forest member
//!
//! Split search runs a sort-once sweep per candidate feature: rows are
//! ordered by feature value and class counts (or running sums for
//! regression) move from the right side to the left one row at a time, so
//! every boundary between distinct values is scored in a single pass.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RisklabError};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf holding the prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal split; rows with `feature <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Variance reduction (regression)
    Variance,
}

/// A single CART tree.
///
/// Classification leaves hold the majority class label, regression leaves
/// the mean target. Feature subsampling is redrawn at every split from the
/// rng handed to [`DecisionTree::fit`], which is what makes a forest of
/// these trees reproducible for a fixed seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Impurity measure used for split scoring
    pub criterion: Criterion,
    /// Maximum tree depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Minimum samples required to attempt a split
    pub min_samples_split: usize,
    /// Minimum samples each side of a split must keep
    pub min_samples_leaf: usize,
    /// Features drawn at each split (None = all)
    pub max_features: Option<usize>,
    n_features: usize,
    importances: Vec<f64>,
}

/// Per-node state shared by the recursive build
struct FitContext<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    /// Compact class index per row; empty for regression
    class_of: Vec<usize>,
    /// Distinct labels sorted ascending; empty for regression
    classes: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl DecisionTree {
    pub fn new(criterion: Criterion) -> Self {
        Self {
            root: None,
            criterion,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
            importances: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n.max(1);
        self
    }

    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n.max(1));
        self
    }

    /// Grow the tree on the given rows.
    ///
    /// The rng drives feature subsampling and must be threaded in by the
    /// caller so repeated fits with the same seed grow the same tree.
    pub fn fit<'a>(
        &mut self,
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
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
                "cannot fit a tree on zero rows".to_string(),
            ));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];

        let ctx = self.build_context(x, y);
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(&ctx, &indices, 0, rng, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in &mut importances {
                *value /= total;
            }
        }
        self.importances = importances;

        Ok(self)
    }

    fn build_context<'a>(&self, x: ArrayView2<'a, f64>, y: ArrayView1<'a, f64>) -> FitContext<'a> {
        match self.criterion {
            Criterion::Gini => {
                let mut classes: Vec<f64> = y.iter().copied().collect();
                classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                classes.dedup();
                let class_of = y
                    .iter()
                    .map(|v| {
                        classes
                            .iter()
                            .position(|c| c == v)
                            .unwrap_or(0)
                    })
                    .collect();
                FitContext { x, y, class_of, classes }
            }
            Criterion::Variance => FitContext {
                x,
                y,
                class_of: Vec::new(),
                classes: Vec::new(),
            },
        }
    }

    fn build_node(
        &self,
        ctx: &FitContext<'_>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_node = indices.len();

        let should_stop = n_node < self.min_samples_split
            || n_node <= self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(ctx.y, indices);

        if should_stop {
            return self.leaf(ctx, indices);
        }

        match self.find_best_split(ctx, indices, rng) {
            Some(split) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| ctx.x[[i, split.feature]] <= split.threshold);

                importances[split.feature] += n_node as f64 * split.gain;

                let left = Box::new(self.build_node(ctx, &left_idx, depth + 1, rng, importances));
                let right = Box::new(self.build_node(ctx, &right_idx, depth + 1, rng, importances));
                TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                    n_samples: n_node,
                }
            }
            None => self.leaf(ctx, indices),
        }
    }

    fn leaf(&self, ctx: &FitContext<'_>, indices: &[usize]) -> TreeNode {
        let value = match self.criterion {
            Criterion::Gini => {
                let mut counts = vec![0usize; ctx.classes.len()];
                for &i in indices {
                    counts[ctx.class_of[i]] += 1;
                }
                // strict > keeps the smallest label on ties
                let mut best = 0;
                for (k, &count) in counts.iter().enumerate() {
                    if count > counts[best] {
                        best = k;
                    }
                }
                ctx.classes[best]
            }
            Criterion::Variance => {
                let sum: f64 = indices.iter().map(|&i| ctx.y[i]).sum();
                sum / indices.len() as f64
            }
        };
        TreeNode::Leaf {
            value,
            n_samples: indices.len(),
        }
    }

    fn find_best_split(
        &self,
        ctx: &FitContext<'_>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let parent_impurity = self.node_impurity(ctx, indices);
        if parent_impurity <= 0.0 {
            return None;
        }

        let candidates = self.sample_features(rng);
        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = Vec::with_capacity(indices.len());

        for feature in candidates {
            order.clear();
            order.extend_from_slice(indices);
            order.sort_by(|&a, &b| {
                ctx.x[[a, feature]]
                    .partial_cmp(&ctx.x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            match self.criterion {
                Criterion::Gini => {
                    self.sweep_gini(ctx, &order, feature, parent_impurity, &mut best)
                }
                Criterion::Variance => {
                    self.sweep_variance(ctx, &order, feature, parent_impurity, &mut best)
                }
            }
        }

        best
    }

    /// Random feature subset for one split, ascending for a stable scan
    /// order.
    fn sample_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let k = self
            .max_features
            .unwrap_or(self.n_features)
            .min(self.n_features)
            .max(1);
        if k >= self.n_features {
            (0..self.n_features).collect()
        } else {
            let mut picked = rand::seq::index::sample(rng, self.n_features, k).into_vec();
            picked.sort_unstable();
            picked
        }
    }

    fn sweep_gini(
        &self,
        ctx: &FitContext<'_>,
        order: &[usize],
        feature: usize,
        parent_impurity: f64,
        best: &mut Option<BestSplit>,
    ) {
        let m = order.len();
        let n_classes = ctx.classes.len();
        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = vec![0usize; n_classes];
        for &i in order {
            right_counts[ctx.class_of[i]] += 1;
        }

        for pos in 1..m {
            let prev = order[pos - 1];
            let class = ctx.class_of[prev];
            left_counts[class] += 1;
            right_counts[class] -= 1;

            let v_prev = ctx.x[[prev, feature]];
            let v_next = ctx.x[[order[pos], feature]];
            if v_next <= v_prev {
                continue;
            }
            if pos < self.min_samples_leaf || m - pos < self.min_samples_leaf {
                continue;
            }

            let gini_left = gini_from_counts(&left_counts, pos);
            let gini_right = gini_from_counts(&right_counts, m - pos);
            let weighted =
                (pos as f64 * gini_left + (m - pos) as f64 * gini_right) / m as f64;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                *best = Some(BestSplit {
                    feature,
                    threshold: midpoint(v_prev, v_next),
                    gain,
                });
            }
        }
    }

    fn sweep_variance(
        &self,
        ctx: &FitContext<'_>,
        order: &[usize],
        feature: usize,
        parent_impurity: f64,
        best: &mut Option<BestSplit>,
    ) {
        let m = order.len();
        let total_sum: f64 = order.iter().map(|&i| ctx.y[i]).sum();
        let total_sq: f64 = order.iter().map(|&i| ctx.y[i] * ctx.y[i]).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for pos in 1..m {
            let prev = order[pos - 1];
            let y_prev = ctx.y[prev];
            left_sum += y_prev;
            left_sq += y_prev * y_prev;

            let v_prev = ctx.x[[prev, feature]];
            let v_next = ctx.x[[order[pos], feature]];
            if v_next <= v_prev {
                continue;
            }
            if pos < self.min_samples_leaf || m - pos < self.min_samples_leaf {
                continue;
            }

            let var_left = variance_from_sums(left_sum, left_sq, pos);
            let var_right = variance_from_sums(total_sum - left_sum, total_sq - left_sq, m - pos);
            let weighted = (pos as f64 * var_left + (m - pos) as f64 * var_right) / m as f64;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                *best = Some(BestSplit {
                    feature,
                    threshold: midpoint(v_prev, v_next),
                    gain,
                });
            }
        }
    }

    fn node_impurity(&self, ctx: &FitContext<'_>, indices: &[usize]) -> f64 {
        match self.criterion {
            Criterion::Gini => {
                let mut counts = vec![0usize; ctx.classes.len()];
                for &i in indices {
                    counts[ctx.class_of[i]] += 1;
                }
                gini_from_counts(&counts, indices.len())
            }
            Criterion::Variance => {
                let sum: f64 = indices.iter().map(|&i| ctx.y[i]).sum();
                let sq: f64 = indices.iter().map(|&i| ctx.y[i] * ctx.y[i]).sum();
                variance_from_sums(sum, sq, indices.len())
            }
        }
    }

    /// Predict a single row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or(RisklabError::NotTrained)?;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Predict every row of a matrix.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let mut out = Vec::with_capacity(x.nrows());
        for i in 0..x.nrows() {
            out.push(self.predict_row(x.row(i))?);
        }
        Ok(Array1::from_vec(out))
    }

    /// Normalized importance per feature, available after fitting
    pub fn feature_importances(&self) -> Option<&[f64]> {
        if self.root.is_some() {
            Some(&self.importances)
        } else {
            None
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    /// Depth of the fitted tree (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map_or(0, walk)
    }
}

fn is_pure(y: ArrayView1<'_, f64>, indices: &[usize]) -> bool {
    let first = y[indices[0]];
    indices.iter().all(|&i| (y[i] - first).abs() < 1e-10)
}

fn gini_from_counts(counts: &[usize], total: usize) -> f64 {
    let n = total as f64;
    let mut sum_sq = 0.0;
    for &count in counts {
        let p = count as f64 / n;
        sum_sq += p * p;
    }
    1.0 - sum_sq
}

fn variance_from_sums(sum: f64, sq_sum: f64, count: usize) -> f64 {
    let n = count as f64;
    // clamp float cancellation on near-constant targets
    (sq_sum / n - (sum / n).powi(2)).max(0.0)
}

/// Midpoint between adjacent distinct values. When rounding pushes the
/// midpoint onto the upper value, fall back to the lower one so the left
/// side of the split keeps the rows it was scored with.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = (lower + upper) / 2.0;
    if mid >= upper {
        lower
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    #[test]
    fn test_classifier_simple() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(Criterion::Gini);
        tree.fit(x.view(), y.view(), &mut rng()).unwrap();
        assert!(tree.is_fitted());

        let preds = tree.predict(x.view()).unwrap();
        for (pred, actual) in preds.iter().zip(y.iter()) {
            assert_eq!(pred, actual);
        }
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];

        let mut tree = DecisionTree::new(Criterion::Variance);
        tree.fit(x.view(), y.view(), &mut rng()).unwrap();

        let pred = tree.predict_row(array![2.0].view()).unwrap();
        assert!((pred - 1.0).abs() < 1e-9);
        let pred = tree.predict_row(array![5.5].view()).unwrap();
        assert!((pred - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x = array![
            [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]
        ];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let mut tree = DecisionTree::new(Criterion::Variance).with_max_depth(2);
        tree.fit(x.view(), y.view(), &mut rng()).unwrap();
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(Criterion::Gini).with_min_samples_leaf(3);
        tree.fit(x.view(), y.view(), &mut rng()).unwrap();

        fn smallest_leaf(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { n_samples, .. } => *n_samples,
                TreeNode::Split { left, right, .. } => smallest_leaf(left).min(smallest_leaf(right)),
            }
        }
        assert!(smallest_leaf(tree.root.as_ref().unwrap()) >= 3);
    }

    #[test]
    fn test_pure_node_is_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![7.0, 7.0, 7.0];

        let mut tree = DecisionTree::new(Criterion::Variance);
        tree.fit(x.view(), y.view(), &mut rng()).unwrap();
        assert_eq!(tree.depth(), 0);
        assert!((tree.predict_row(array![2.0].view()).unwrap() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_feature_importances_sum_to_one() {
        let x = array![
            [1.0, 5.0],
            [2.0, 5.0],
            [3.0, 5.0],
            [10.0, 5.0],
            [11.0, 5.0],
            [12.0, 5.0]
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(Criterion::Gini);
        tree.fit(x.view(), y.view(), &mut rng()).unwrap();

        let importances = tree.feature_importances().unwrap();
        let total: f64 = importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // the constant second column cannot contribute
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new(Criterion::Gini);
        assert!(!tree.is_fitted());
        let err = tree.predict_row(array![1.0].view()).unwrap_err();
        assert!(matches!(err, RisklabError::NotTrained));
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut tree = DecisionTree::new(Criterion::Variance);
        let err = tree.fit(x.view(), y.view(), &mut rng()).unwrap_err();
        assert!(matches!(err, RisklabError::Shape { .. }));
    }
}
