use std::collections::BTreeMap;
use std::fmt;

/// Zero-based attribute column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct AttributeIndex(usize);

impl AttributeIndex {
    /// Create a new attribute index from a zero-based column position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based attribute column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AttributeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A class label. Labels are dense, non-negative and ordered ascending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct ClassLabel(usize);

impl ClassLabel {
    /// Create a class label.
    #[must_use]
    pub fn new(label: usize) -> Self {
        Self(label)
    }

    /// Return the raw label, usable as a row/column of a confusion matrix.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A split point on an attribute. Values strictly below it take the true branch.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Threshold(f64);

impl Threshold {
    /// Create a threshold.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw threshold value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return `true` when `value` falls on the true branch.
    #[must_use]
    pub fn is_below(self, value: f64) -> bool {
        value < self.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into the node arena of a [`TrainingTree`](crate::TrainingTree).
///
/// Indices are handed out in creation order and never reused, so a
/// `NodeIndex` stays valid while the tree grows or gets pruned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gini impurity value in `[0, 1)`.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Why a node was left terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StopReason {
    /// The node sits deeper than the configured maximum depth.
    MaxDepth,
    /// The node impurity fell below the splitting threshold.
    Pure,
    /// The best split would leave a child with too few points.
    Unbalanced,
    /// No attribute produced a usable threshold.
    NoThreshold,
    /// The node replaced two depth-limited leaves during pruning.
    Pruned,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::MaxDepth => "max-depth",
            StopReason::Pure => "pure",
            StopReason::Unbalanced => "unbalanced",
            StopReason::NoThreshold => "no-threshold",
            StopReason::Pruned => "pruned",
        };
        f.write_str(s)
    }
}

/// Interior node: routes a point by comparing one attribute to a threshold.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionNode {
    /// Attribute compared at this node.
    pub attribute: AttributeIndex,
    /// Points with `value < threshold` follow `if_true`.
    pub threshold: Threshold,
    /// Impurity of the point set when the node was created.
    pub impurity: Impurity,
    /// Distance from the root (root is 0).
    pub depth: usize,
    /// Child reached through the true-tagged edge.
    pub if_true: NodeIndex,
    /// Child reached through the false-tagged edge.
    pub if_false: NodeIndex,
}

/// Terminal node holding a class decision.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FinalNode {
    /// Dominant class of the points that reached the node.
    pub class: ClassLabel,
    /// Gini impurity of those points.
    pub impurity: Impurity,
    /// Distance from the root (root is 0).
    pub depth: usize,
    /// Indices of the training points that reached the node.
    pub points: Vec<usize>,
    /// Number of those points per class.
    pub votes: BTreeMap<ClassLabel, usize>,
    /// Why the node was not split further.
    pub stop: StopReason,
}

/// A node of a trained tree.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node with exactly two outgoing edges.
    Decision(DecisionNode),
    /// Leaf node with no outgoing edge.
    Final(FinalNode),
}

impl Node {
    /// Return the impurity recorded at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Decision(d) => d.impurity,
            Node::Final(f) => f.impurity,
        }
    }

    /// Return the depth of this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Node::Decision(d) => d.depth,
            Node::Final(f) => f.depth,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Node::Final(_))
    }
}

/// Role of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NodeRole {
    /// The root node, holding a decision.
    Root,
    /// An interior, non-root node.
    Decision,
    /// A leaf, including a root that was never split.
    Final,
}

/// A directed edge between a decision node and one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    /// Parent decision node.
    pub from: NodeIndex,
    /// Child node.
    pub to: NodeIndex,
    /// `true` when this edge is taken for `value < threshold`.
    pub is_true_branch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- newtypes ---

    #[test]
    fn attribute_index_roundtrip() {
        let ai = AttributeIndex::new(7);
        assert_eq!(ai.index(), 7);
        assert_eq!(format!("{ai}"), "7");
    }

    #[test]
    fn class_label_ordering() {
        assert!(ClassLabel::new(1) < ClassLabel::new(4));
        assert_eq!(ClassLabel::new(3), ClassLabel::new(3));
    }

    #[test]
    fn threshold_is_strict() {
        let t = Threshold::new(2.5);
        assert!(t.is_below(2.4));
        assert!(!t.is_below(2.5));
        assert!(!t.is_below(3.0));
    }

    #[test]
    fn threshold_ordering_matches_float() {
        assert!(Threshold::new(-1.0) < Threshold::new(0.5));
        assert!(Threshold::new(f64::NAN).partial_cmp(&Threshold::new(0.0)).is_none());
    }

    #[test]
    fn impurity_display() {
        assert_eq!(format!("{}", Impurity::new(0.333333)), "0.333333");
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::MaxDepth.to_string(), "max-depth");
        assert_eq!(StopReason::NoThreshold.to_string(), "no-threshold");
    }

    // --- Node ---

    fn make_final() -> Node {
        Node::Final(FinalNode {
            class: ClassLabel::new(1),
            impurity: Impurity::new(0.32),
            depth: 2,
            points: vec![4, 5, 9],
            votes: BTreeMap::from([(ClassLabel::new(1), 2), (ClassLabel::new(0), 1)]),
            stop: StopReason::Pure,
        })
    }

    fn make_decision() -> Node {
        Node::Decision(DecisionNode {
            attribute: AttributeIndex::new(2),
            threshold: Threshold::new(3.5),
            impurity: Impurity::new(0.48),
            depth: 1,
            if_true: NodeIndex::new(2),
            if_false: NodeIndex::new(3),
        })
    }

    #[test]
    fn final_is_final() {
        assert!(make_final().is_final());
        assert!(!make_decision().is_final());
    }

    #[test]
    fn node_accessors() {
        assert_eq!(make_final().depth(), 2);
        assert_eq!(make_decision().depth(), 1);
        assert!((make_decision().impurity().value() - 0.48).abs() < f64::EPSILON);
    }
}
