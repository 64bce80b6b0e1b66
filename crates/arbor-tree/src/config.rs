//! Configuration builder for decision tree induction.

use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::histogram::HistogramConfig;
use crate::threshold::GainWeighting;
use crate::tree::TrainingTree;

/// Threshold search used at every node.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub enum SplitMethod {
    /// Midpoints between all distinct sorted values.
    #[default]
    Exact,
    /// Boundaries of a variable-bin-size histogram.
    Histogram(HistogramConfig),
}

/// Configuration for growing a [`TrainingTree`].
///
/// Construct via [`TreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default  |
/// |----------------------|----------|
/// | `min_gini_for_split` | 0.05     |
/// | `min_points`         | 3        |
/// | `max_depth`          | 10       |
/// | `removal_coeff`      | 0.05     |
/// | `split_method`       | `Exact`  |
/// | `gain_weighting`     | `Even`   |
/// | `prune`              | `false`  |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeConfig {
    pub(crate) min_gini_for_split: f64,
    pub(crate) min_points: usize,
    pub(crate) max_depth: usize,
    pub(crate) removal_coeff: f64,
    pub(crate) split_method: SplitMethod,
    pub(crate) gain_weighting: GainWeighting,
    pub(crate) prune: bool,
}

impl TreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_gini_for_split: 0.05,
            min_points: 3,
            max_depth: 10,
            removal_coeff: 0.05,
            split_method: SplitMethod::Exact,
            gain_weighting: GainWeighting::Even,
            prune: false,
        }
    }

    // --- Setters ---

    /// Set the impurity below which a node is not split.
    #[must_use]
    pub fn with_min_gini_for_split(mut self, min_gini: f64) -> Self {
        self.min_gini_for_split = min_gini;
        self
    }

    /// Set the minimum number of points each child of a split must receive.
    #[must_use]
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Set the depth past which nodes are no longer split (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the near-duplicate tolerance of the exact search, as a fraction
    /// of the attribute range.
    #[must_use]
    pub fn with_removal_coeff(mut self, removal_coeff: f64) -> Self {
        self.removal_coeff = removal_coeff;
        self
    }

    /// Set the threshold search strategy.
    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Set how the two sides of a split are averaged in the gain.
    #[must_use]
    pub fn with_gain_weighting(mut self, gain_weighting: GainWeighting) -> Self {
        self.gain_weighting = gain_weighting;
        self
    }

    /// Prune depth-limited sibling leaves once the tree is grown.
    #[must_use]
    pub fn with_pruning(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    // --- Getters ---

    /// Return the impurity below which a node is not split.
    #[must_use]
    pub fn min_gini_for_split(&self) -> f64 {
        self.min_gini_for_split
    }

    /// Return the minimum child size.
    #[must_use]
    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /// Return the maximum split depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the near-duplicate tolerance.
    #[must_use]
    pub fn removal_coeff(&self) -> f64 {
        self.removal_coeff
    }

    /// Return the threshold search strategy.
    #[must_use]
    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    /// Return the gain weighting.
    #[must_use]
    pub fn gain_weighting(&self) -> GainWeighting {
        self.gain_weighting
    }

    /// Return whether the grown tree is pruned.
    #[must_use]
    pub fn prune(&self) -> bool {
        self.prune
    }

    pub(crate) fn validate(&self) -> Result<(), TreeError> {
        if !self.min_gini_for_split.is_finite() || self.min_gini_for_split < 0.0 {
            return Err(TreeError::InvalidMinGini {
                min_gini: self.min_gini_for_split,
            });
        }
        if self.min_points == 0 {
            return Err(TreeError::InvalidMinPoints {
                min_points: self.min_points,
            });
        }
        if !(0.0..1.0).contains(&self.removal_coeff) {
            return Err(TreeError::InvalidRemovalCoeff {
                removal_coeff: self.removal_coeff,
            });
        }
        if let SplitMethod::Histogram(histogram) = &self.split_method {
            histogram.validate()?;
        }
        Ok(())
    }

    /// Grow a decision tree on the labelled points of `dataset`.
    ///
    /// Unlabelled points are ignored.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                  |
    /// |------------------------------------|---------------------------------------|
    /// | [`TreeError::InvalidMinGini`]      | `min_gini_for_split` negative or NaN  |
    /// | [`TreeError::InvalidMinPoints`]    | `min_points` is zero                  |
    /// | [`TreeError::InvalidRemovalCoeff`] | `removal_coeff` outside `[0, 1)`      |
    /// | [`TreeError::InvalidBinCount`]     | histogram asks for zero bins          |
    /// | [`TreeError::ZeroAttributes`]      | the dataset has no attribute          |
    /// | [`TreeError::TooFewPoints`]        | fewer than 2 labelled points          |
    pub fn fit(&self, dataset: &Dataset) -> Result<TrainingTree, TreeError> {
        crate::tree::grow(self, dataset)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new()
    }
}
