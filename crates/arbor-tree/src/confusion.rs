//! Confusion matrix and one-vs-rest classification scores.

use std::fmt;

use crate::error::TreeError;
use crate::node::ClassLabel;

/// A square confusion matrix.
///
/// Entry `matrix[predicted][true]` counts how many points of class `true`
/// were classified as `predicted`. Counts only grow until [`reset`](Self::reset).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// One-vs-rest scores of a single class.
///
/// Ratios with a zero denominator are reported as `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassScores {
    /// The class treated as positive.
    pub class: ClassLabel,
    /// Positive points classified positive.
    pub true_positives: usize,
    /// Negative points classified positive.
    pub false_positives: usize,
    /// Positive points classified negative.
    pub false_negatives: usize,
    /// Negative points classified negative.
    pub true_negatives: usize,
    /// Sensitivity, `TP / (TP + FN)`.
    pub tpr: f64,
    /// Specificity, `TN / (TN + FP)`.
    pub tnr: f64,
    /// Accuracy, `(TP + TN) / total`.
    pub acc: f64,
    /// Balanced accuracy, `(TPR + TNR) / 2`.
    pub bacc: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ConfusionMatrix {
    /// Create an all-zero matrix for classes `0..n_classes`.
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0; n_classes]; n_classes],
            n_classes,
        }
    }

    /// Record one point of class `truth` classified as `predicted`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::ClassOutOfRange`] | either label is not below `n_classes` |
    pub fn add(&mut self, truth: ClassLabel, predicted: ClassLabel) -> Result<(), TreeError> {
        for class in [truth, predicted] {
            if class.index() >= self.n_classes {
                return Err(TreeError::ClassOutOfRange {
                    class: class.index(),
                    n_classes: self.n_classes,
                });
            }
        }
        self.matrix[predicted.index()][truth.index()] += 1;
        Ok(())
    }

    /// Add every count of `other` into this matrix.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ClassOutOfRange`] when `other` is larger than `self`.
    pub fn accumulate(&mut self, other: &ConfusionMatrix) -> Result<(), TreeError> {
        if other.n_classes > self.n_classes {
            return Err(TreeError::ClassOutOfRange {
                class: other.n_classes - 1,
                n_classes: self.n_classes,
            });
        }
        for (p, row) in other.matrix.iter().enumerate() {
            for (t, &count) in row.iter().enumerate() {
                self.matrix[p][t] += count;
            }
        }
        Ok(())
    }

    /// Zero every cell.
    pub fn reset(&mut self) {
        for row in &mut self.matrix {
            row.fill(0);
        }
    }

    /// Count of points of class `truth` classified as `predicted`.
    ///
    /// Out-of-range labels read as zero.
    #[must_use]
    pub fn get(&self, predicted: ClassLabel, truth: ClassLabel) -> usize {
        self.matrix
            .get(predicted.index())
            .and_then(|row| row.get(truth.index()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of points classified as `predicted`.
    #[must_use]
    pub fn row_sum(&self, predicted: ClassLabel) -> usize {
        self.matrix
            .get(predicted.index())
            .map_or(0, |row| row.iter().sum())
    }

    /// Number of points whose true class is `truth`.
    #[must_use]
    pub fn col_sum(&self, truth: ClassLabel) -> usize {
        self.matrix
            .iter()
            .filter_map(|row| row.get(truth.index()))
            .sum()
    }

    /// Number of recorded points.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Proportion of correctly classified points.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        ratio(correct, self.total())
    }

    /// Proportion of misclassified points.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        ratio(self.total() - correct, self.total())
    }

    /// One-vs-rest scores with `class` as the positive class.
    #[must_use]
    pub fn class_scores(&self, class: ClassLabel) -> ClassScores {
        let tp = self.get(class, class);
        let fp = self.row_sum(class) - tp;
        let fn_ = self.col_sum(class) - tp;
        let tn = self.total() - tp - fp - fn_;

        let tpr = ratio(tp, tp + fn_);
        let tnr = ratio(tn, tn + fp);
        ClassScores {
            class,
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            true_negatives: tn,
            tpr,
            tnr,
            acc: ratio(tp + tn, self.total()),
            bacc: (tpr + tnr) / 2.0,
        }
    }

    /// Binary scores with class 0 as positive.
    #[must_use]
    pub fn binary_scores(&self) -> ClassScores {
        self.class_scores(ClassLabel::new(0))
    }

    /// One-vs-rest scores of every class, ascending.
    #[must_use]
    pub fn all_scores(&self) -> Vec<ClassScores> {
        (0..self.n_classes)
            .map(|c| self.class_scores(ClassLabel::new(c)))
            .collect()
    }

    /// Return the underlying rows, indexed by predicted class.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " true_{j:>3}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "pred_{i:>3}")?;
            for val in row {
                write!(f, " {val:>8}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
