//! Binary decision tree classification: induce, prune, classify, evaluate.
//!
//! Trees are grown from a [`Dataset`] of continuous attributes by splitting
//! nodes on the threshold with the highest Gini-impurity gain. Thresholds come
//! from an exact search over sorted values or from a variable-bin-size
//! histogram. Trained trees classify points, fill a [`ConfusionMatrix`] and can
//! be evaluated by k-fold [`CrossValidation`].

mod config;
mod confusion;
mod dataset;
mod error;
mod eval;
mod histogram;
mod impurity;
mod node;
mod prune;
mod stats;
mod threshold;
mod tree;

pub use config::{SplitMethod, TreeConfig};
pub use confusion::{ClassScores, ConfusionMatrix};
pub use dataset::{Dataset, Point};
pub use error::TreeError;
pub use eval::{CrossValidation, CrossValidationResult, FoldResult};
pub use histogram::{
    Histogram, HistogramBin, HistogramConfig, HistogramEntry, MaxDepthPolicy, histogram_threshold,
};
pub use impurity::{
    ClassVotes, NodeContent, class_votes, dominant_class, dominant_from_votes, gini_from_votes,
    gini_impurity,
};
pub use node::{
    AttributeIndex, ClassLabel, DecisionNode, Edge, FinalNode, Impurity, Node, NodeIndex, NodeRole,
    StopReason, Threshold,
};
pub use stats::{AttributeStats, DatasetStats, tag_outliers};
pub use threshold::{AttributeSplit, GainWeighting, exact_threshold, remove_duplicates};
pub use tree::{Classification, TrainingTree};
