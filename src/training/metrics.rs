//! Evaluation metrics for classification and regression

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Metrics produced by a training run, one variant per task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Metrics {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

impl Metrics {
    pub fn accuracy(&self) -> Option<f64> {
        match self {
            Metrics::Classification(m) => Some(m.accuracy),
            Metrics::Regression(_) => None,
        }
    }

    pub fn mse(&self) -> Option<f64> {
        match self {
            Metrics::Regression(m) => Some(m.mse),
            Metrics::Classification(_) => None,
        }
    }

    pub fn r2(&self) -> Option<f64> {
        match self {
            Metrics::Regression(m) => Some(m.r2),
            Metrics::Classification(_) => None,
        }
    }
}

/// Accuracy, confusion matrix, and per-class report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

impl ClassificationMetrics {
    /// Compute from aligned truth/prediction slices. `class_labels` are
    /// the labels the model was trained on; they keep their axis entries
    /// even when a small test partition never shows them.
    pub fn compute(y_true: &[i64], y_pred: &[i64], class_labels: &[i64]) -> Self {
        let confusion = ConfusionMatrix::from_pairs(y_true, y_pred, class_labels);
        let report = ClassificationReport::from_confusion(&confusion);
        let accuracy = report.accuracy;
        Self {
            accuracy,
            confusion,
            report,
        }
    }
}

/// True-by-predicted class counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Distinct labels sorted ascending; indexes both axes
    pub labels: Vec<i64>,
    /// `counts[t][p]` = rows with true label `labels[t]` predicted as `labels[p]`
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build from aligned truth/prediction slices plus any further labels
    /// that should keep a row and column.
    pub fn from_pairs(y_true: &[i64], y_pred: &[i64], extra_labels: &[i64]) -> Self {
        let labels: Vec<i64> = y_true
            .iter()
            .chain(y_pred.iter())
            .chain(extra_labels.iter())
            .copied()
            .collect::<BTreeSet<i64>>()
            .into_iter()
            .collect();

        let index: BTreeMap<i64, usize> =
            labels.iter().enumerate().map(|(i, &l)| (l, i)).collect();

        let k = labels.len();
        let mut counts = vec![vec![0usize; k]; k];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            if let (Some(&ti), Some(&pi)) = (index.get(t), index.get(p)) {
                counts[ti][pi] += 1;
            }
        }

        Self { labels, counts }
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Total row count across all cells
    pub fn total(&self) -> usize {
        self.counts.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    /// Count for a (true, predicted) label pair
    pub fn get(&self, true_label: i64, pred_label: i64) -> Option<usize> {
        let t = self.labels.binary_search(&true_label).ok()?;
        let p = self.labels.binary_search(&pred_label).ok()?;
        Some(self.counts[t][p])
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "")?;
        for label in &self.labels {
            write!(f, "{:>10}", format!("pred {}", label))?;
        }
        writeln!(f)?;
        for (i, label) in self.labels.iter().enumerate() {
            write!(f, "{:>10}", format!("true {}", label))?;
            for count in &self.counts[i] {
                write!(f, "{:>10}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Precision, recall, and F1 for one class
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassScores {
    pub label: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averages across classes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AverageScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Per-class precision/recall/F1 with macro and support-weighted averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: AverageScores,
    pub weighted_avg: AverageScores,
    /// Total test rows
    pub support: usize,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let k = cm.n_classes();
        let total = cm.total();

        let mut classes = Vec::with_capacity(k);
        for i in 0..k {
            let tp = cm.counts[i][i];
            let row_sum: usize = cm.counts[i].iter().sum();
            let col_sum: usize = (0..k).map(|t| cm.counts[t][i]).sum();

            let precision = if col_sum > 0 {
                tp as f64 / col_sum as f64
            } else {
                0.0
            };
            let recall = if row_sum > 0 {
                tp as f64 / row_sum as f64
            } else {
                0.0
            };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            classes.push(ClassScores {
                label: cm.labels[i],
                precision,
                recall,
                f1,
                support: row_sum,
            });
        }

        let diag: usize = (0..k).map(|i| cm.counts[i][i]).sum();
        let accuracy = if total > 0 {
            diag as f64 / total as f64
        } else {
            0.0
        };

        let n_classes = k.max(1) as f64;
        let macro_avg = AverageScores {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
        };

        let n_rows = total.max(1) as f64;
        let weighted_avg = AverageScores {
            precision: classes
                .iter()
                .map(|c| c.precision * c.support as f64)
                .sum::<f64>()
                / n_rows,
            recall: classes
                .iter()
                .map(|c| c.recall * c.support as f64)
                .sum::<f64>()
                / n_rows,
            f1: classes.iter().map(|c| c.f1 * c.support as f64).sum::<f64>() / n_rows,
        };

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
            support: total,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>13} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>13} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>13} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        writeln!(
            f,
            "{:>13} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "macro avg",
            self.macro_avg.precision,
            self.macro_avg.recall,
            self.macro_avg.f1,
            self.support
        )?;
        write!(
            f,
            "{:>13} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "weighted avg",
            self.weighted_avg.precision,
            self.weighted_avg.recall,
            self.weighted_avg.f1,
            self.support
        )
    }
}

/// Mean squared error and coefficient of determination
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Self {
        let n = y_true.len() as f64;
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum();
        let mse = ss_res / n;

        let mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
        // a constant truth vector has no variance to explain
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Self { mse, r2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_confusion_matrix_counts() {
        let y_true = [0i64, 0, 1, 1, 1];
        let y_pred = [0i64, 1, 1, 1, 0];
        let cm = ConfusionMatrix::from_pairs(&y_true, &y_pred, &[]);

        assert_eq!(cm.labels, vec![0, 1]);
        assert_eq!(cm.get(0, 0), Some(1));
        assert_eq!(cm.get(0, 1), Some(1));
        assert_eq!(cm.get(1, 0), Some(1));
        assert_eq!(cm.get(1, 1), Some(2));
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_confusion_matrix_keeps_extra_labels() {
        // one test row, correctly predicted: the matrix still spans
        // every trained class
        let cm = ConfusionMatrix::from_pairs(&[0], &[0], &[0, 1]);
        assert_eq!(cm.labels, vec![0, 1]);
        assert_eq!(cm.n_classes(), 2);
        assert_eq!(cm.total(), 1);
    }

    #[test]
    fn test_confusion_matrix_sorted_union() {
        let cm = ConfusionMatrix::from_pairs(&[3, 1], &[1, 5], &[]);
        assert_eq!(cm.labels, vec![1, 3, 5]);
    }

    #[test]
    fn test_classification_report_perfect() {
        let y = [0i64, 0, 1, 1];
        let m = ClassificationMetrics::compute(&y, &y, &[]);
        assert_eq!(m.accuracy, 1.0);
        for c in &m.report.classes {
            assert_eq!(c.precision, 1.0);
            assert_eq!(c.recall, 1.0);
            assert_eq!(c.f1, 1.0);
        }
        assert_eq!(m.report.support, 4);
    }

    #[test]
    fn test_classification_report_scores() {
        let y_true = [0i64, 0, 1, 1, 1];
        let y_pred = [0i64, 1, 1, 1, 0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred, &[]);

        assert!((m.accuracy - 0.6).abs() < 1e-9);
        // class 1: tp=2, predicted 3 times, present 3 times
        let c1 = &m.report.classes[1];
        assert!((c1.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((c1.recall - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_display_layout() {
        let m = ClassificationMetrics::compute(&[0, 1], &[0, 1], &[]);
        let rendered = m.report.to_string();
        assert!(rendered.contains("precision"));
        assert!(rendered.contains("macro avg"));
        assert!(rendered.contains("weighted avg"));
    }

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![1.0, 2.0, 3.0, 4.0];
        let m = RegressionMetrics::compute(y_true.view(), y_pred.view());
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.r2, 1.0);

        let y_off = array![2.0, 3.0, 4.0, 5.0];
        let m = RegressionMetrics::compute(y_true.view(), y_off.view());
        assert!((m.mse - 1.0).abs() < 1e-9);
        assert!(m.r2 < 1.0);
    }

    #[test]
    fn test_regression_constant_truth() {
        let y_true = array![3.0, 3.0, 3.0];
        let y_pred = array![2.0, 3.0, 4.0];
        let m = RegressionMetrics::compute(y_true.view(), y_pred.view());
        assert_eq!(m.r2, 0.0);
        assert!(m.mse > 0.0);
    }

    #[test]
    fn test_metrics_accessors() {
        let m = Metrics::Regression(RegressionMetrics { mse: 0.5, r2: 0.9 });
        assert_eq!(m.mse(), Some(0.5));
        assert_eq!(m.r2(), Some(0.9));
        assert_eq!(m.accuracy(), None);
    }
}
