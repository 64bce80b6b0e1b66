//! k-fold cross-validation of decision trees.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::config::TreeConfig;
use crate::confusion::ConfusionMatrix;
use crate::dataset::Dataset;
use crate::error::TreeError;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_*` methods.
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `seed`    | 42      |
/// | `shuffle` | `true`  |
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
    shuffle: bool,
}

/// Outcome of one fold.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FoldResult {
    /// Zero-based fold index.
    pub fold: usize,
    /// Number of training points.
    pub n_train: usize,
    /// Number of held-out points.
    pub n_test: usize,
    /// Error rate on the training points.
    pub train_error: f64,
    /// Error rate on the held-out points.
    pub test_error: f64,
    /// Leaves of the fold's tree.
    pub n_leaves: usize,
    /// Depth of the fold's tree.
    pub depth: usize,
}

/// Results of k-fold cross-validation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrossValidationResult {
    /// Per-fold outcomes, in fold order.
    pub folds: Vec<FoldResult>,
    /// Held-out confusion matrix summed across folds.
    pub confusion: ConfusionMatrix,
    /// Mean held-out error rate.
    pub mean_test_error: f64,
    /// Standard deviation of the held-out error rates.
    pub std_test_error: f64,
    /// Mean training error rate.
    pub mean_train_error: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Number of labelled points used.
    pub n_points: usize,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, TreeError> {
        if n_folds < 2 {
            return Err(TreeError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            seed: 42,
            shuffle: true,
        })
    }

    /// Set the random seed for shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Shuffle the points before cutting folds.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Train one tree per fold on the other folds and score it on the fold.
    ///
    /// Only labelled points take part. Folds are contiguous slices of the
    /// (optionally shuffled) points, see [`Dataset::folds`], and are trained
    /// in parallel.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::TooFewPointsForFolds`] | fewer labelled points than folds |
    /// | Other tree errors | From training or classification of a fold |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_points = dataset.len()))]
    pub fn evaluate(
        &self,
        config: &TreeConfig,
        dataset: &Dataset,
    ) -> Result<CrossValidationResult, TreeError> {
        let mut data = dataset.labelled_only();
        if data.len() < self.n_folds {
            return Err(TreeError::TooFewPointsForFolds {
                n_points: data.len(),
                n_folds: self.n_folds,
            });
        }
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            data.shuffle(&mut rng);
        }

        let outcomes = (0..self.n_folds)
            .into_par_iter()
            .map(|fold| run_fold(config, &data, fold, self.n_folds))
            .collect::<Result<Vec<_>, _>>()?;

        let mut confusion = ConfusionMatrix::new(data.class_span());
        let mut folds = Vec::with_capacity(self.n_folds);
        for (result, fold_confusion) in outcomes {
            confusion.accumulate(&fold_confusion)?;
            folds.push(result);
        }

        let n = self.n_folds as f64;
        let mean_test_error = folds.iter().map(|f| f.test_error).sum::<f64>() / n;
        let mean_train_error = folds.iter().map(|f| f.train_error).sum::<f64>() / n;
        let std_test_error = {
            let variance = folds
                .iter()
                .map(|f| (f.test_error - mean_test_error).powi(2))
                .sum::<f64>()
                / n;
            variance.sqrt()
        };

        info!(mean_test_error, std_test_error, "cross-validation complete");

        Ok(CrossValidationResult {
            folds,
            confusion,
            mean_test_error,
            std_test_error,
            mean_train_error,
            n_folds: self.n_folds,
            n_points: data.len(),
        })
    }
}

fn run_fold(
    config: &TreeConfig,
    data: &Dataset,
    fold: usize,
    n_folds: usize,
) -> Result<(FoldResult, ConfusionMatrix), TreeError> {
    let (train, test) = data.folds(fold, n_folds)?;
    let tree = config.fit(&train)?;
    let train_result = tree.classify_dataset(&train)?;
    let test_result = tree.classify_dataset(&test)?;

    info!(
        fold,
        train_error = train_result.error_rate,
        test_error = test_result.error_rate,
        "fold completed"
    );

    let result = FoldResult {
        fold,
        n_train: train.len(),
        n_test: test.len(),
        train_error: train_result.error_rate,
        test_error: test_result.error_rate,
        n_leaves: tree.n_leaves(),
        depth: tree.depth(),
    };
    Ok((result, test_result.confusion))
}
