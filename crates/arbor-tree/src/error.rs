/// Errors from dataset handling, tree induction and scoring.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when a vote or impurity is requested over zero points.
    #[error("cannot compute class votes over an empty point set")]
    EmptyIndexSet,

    /// Returned when a point without a class label reaches a vote.
    #[error("point {index} has no class label")]
    UnlabelledPoint {
        /// The zero-based index of the offending point.
        index: usize,
    },

    /// Returned when the training dataset has zero attribute columns.
    #[error("training dataset has zero attributes")]
    ZeroAttributes,

    /// Returned when the training dataset has fewer than two labelled points.
    #[error("training needs at least 2 labelled points, got {n_points}")]
    TooFewPoints {
        /// The number of labelled points available.
        n_points: usize,
    },

    /// Returned when a point has a different number of attributes than its dataset.
    #[error("point has {got} attributes, expected {expected}")]
    AttributeCountMismatch {
        /// The attribute count of the dataset or tree.
        expected: usize,
        /// The attribute count of the offending point.
        got: usize,
    },

    /// Returned when row and label counts differ.
    #[error("{n_rows} rows but {n_labels} labels")]
    LabelCountMismatch {
        /// The number of rows.
        n_rows: usize,
        /// The number of labels.
        n_labels: usize,
    },

    /// Returned when an attribute value is NaN or infinite.
    #[error("non-finite value at point {point_index}, attribute {attribute_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending point.
        point_index: usize,
        /// The zero-based index of the offending attribute.
        attribute_index: usize,
    },

    /// Returned when classifying with a tree that has not been trained.
    #[error("tree has no root node, train it before classifying")]
    UntrainedTree,

    /// Returned when `removal_coeff` is outside `[0, 1)`.
    #[error("removal_coeff must be in [0.0, 1.0), got {removal_coeff}")]
    InvalidRemovalCoeff {
        /// The invalid coefficient.
        removal_coeff: f64,
    },

    /// Returned when `min_gini_for_split` is negative or not finite.
    #[error("min_gini_for_split must be a finite value >= 0.0, got {min_gini}")]
    InvalidMinGini {
        /// The invalid threshold.
        min_gini: f64,
    },

    /// Returned when `min_points` is zero.
    #[error("min_points must be at least 1, got {min_points}")]
    InvalidMinPoints {
        /// The invalid minimum.
        min_points: usize,
    },

    /// Returned when a histogram is requested with zero bins.
    #[error("histogram needs at least 1 bin, got {n_bins}")]
    InvalidBinCount {
        /// The invalid bin count.
        n_bins: usize,
    },

    /// Returned when a histogram is built from values spanning no range.
    #[error("histogram range is empty: all {n_points} values equal {value}")]
    ZeroWidthRange {
        /// The single observed value.
        value: f64,
        /// The number of values provided.
        n_points: usize,
    },

    /// Returned when a fold split is requested with fewer than 2 folds.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid fold count.
        n_folds: usize,
    },

    /// Returned when the fold index is not below the fold count.
    #[error("fold index {index} out of range for {n_folds} folds")]
    InvalidFoldIndex {
        /// The requested fold.
        index: usize,
        /// The number of folds.
        n_folds: usize,
    },

    /// Returned when the dataset is too small to give every fold a point.
    #[error("dataset has {n_points} points, cannot build {n_folds} folds")]
    TooFewPointsForFolds {
        /// The dataset size.
        n_points: usize,
        /// The requested fold count.
        n_folds: usize,
    },

    /// Returned when a class label does not fit the confusion matrix.
    #[error("class {class} outside confusion matrix of {n_classes} classes")]
    ClassOutOfRange {
        /// The offending class label.
        class: usize,
        /// The matrix dimension.
        n_classes: usize,
    },

    /// Returned when scoring a dataset that holds no labelled point.
    #[error("dataset has no labelled point to classify")]
    NothingToClassify,
}
