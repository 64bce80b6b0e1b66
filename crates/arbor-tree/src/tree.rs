use tracing::{debug, info, instrument, trace};

use crate::config::{SplitMethod, TreeConfig};
use crate::confusion::ConfusionMatrix;
use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::histogram::histogram_threshold;
use crate::impurity::{dominant_from_votes, gini_impurity};
use crate::node::{
    AttributeIndex, ClassLabel, DecisionNode, Edge, FinalNode, Impurity, Node, NodeIndex,
    NodeRole, StopReason,
};
use crate::threshold::{AttributeSplit, exact_threshold};

/// A binary decision tree stored as an arena of nodes.
///
/// The root sits at index 0. Children always have a larger index than
/// their parent. Slots freed by [`prune`](Self::prune) stay as tombstones,
/// so a [`NodeIndex`] obtained earlier never points at a different node.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TrainingTree {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) n_attributes: usize,
    pub(crate) n_classes: usize,
}

/// Result of classifying every labelled point of a dataset.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Classification {
    /// Counts of predicted versus true classes.
    pub confusion: ConfusionMatrix,
    /// Proportion of misclassified points.
    pub error_rate: f64,
}

/// Pending node of the induction worklist.
struct Pending {
    index: NodeIndex,
    points: Vec<usize>,
    depth: usize,
}

#[instrument(skip(config, dataset), fields(n_points = dataset.len()))]
pub(crate) fn grow(config: &TreeConfig, dataset: &Dataset) -> Result<TrainingTree, TreeError> {
    config.validate()?;
    if dataset.n_attributes() == 0 {
        return Err(TreeError::ZeroAttributes);
    }
    let labelled = dataset.labelled_indices();
    if labelled.len() < 2 {
        return Err(TreeError::TooFewPoints {
            n_points: labelled.len(),
        });
    }

    debug!(
        n_labelled = labelled.len(),
        n_attributes = dataset.n_attributes(),
        n_classes = dataset.n_classes(),
        "fitting decision tree"
    );

    let mut tree = TrainingTree {
        nodes: vec![None],
        n_attributes: dataset.n_attributes(),
        n_classes: dataset.class_span(),
    };
    let mut worklist = vec![Pending {
        index: NodeIndex::new(0),
        points: labelled,
        depth: 0,
    }];

    while let Some(Pending {
        index,
        points,
        depth,
    }) = worklist.pop()
    {
        let (impurity, votes) = gini_impurity(&points, dataset)?;
        let content = dominant_from_votes(&votes).ok_or(TreeError::EmptyIndexSet)?;
        let mut leaf = FinalNode {
            class: content.class,
            impurity,
            depth,
            points,
            votes,
            stop: StopReason::MaxDepth,
        };

        let stop = if depth > config.max_depth {
            Some(StopReason::MaxDepth)
        } else if impurity.value() < config.min_gini_for_split {
            Some(StopReason::Pure)
        } else {
            None
        };
        if let Some(stop) = stop {
            leaf.stop = stop;
            tree.nodes[index.index()] = Some(Node::Final(leaf));
            continue;
        }

        let Some(split) = best_split(config, &leaf.points, dataset, impurity)? else {
            leaf.stop = StopReason::NoThreshold;
            tree.nodes[index.index()] = Some(Node::Final(leaf));
            continue;
        };

        let attribute = split.attribute.index();
        let (below, above): (Vec<usize>, Vec<usize>) = leaf
            .points
            .iter()
            .copied()
            .partition(|&i| split.threshold.is_below(dataset.point(i).value(attribute)));
        if below.len() < config.min_points || above.len() < config.min_points {
            trace!(%index, n_below = below.len(), n_above = above.len(), "split unbalanced");
            leaf.stop = StopReason::Unbalanced;
            tree.nodes[index.index()] = Some(Node::Final(leaf));
            continue;
        }

        let if_true = tree.reserve();
        let if_false = tree.reserve();
        trace!(
            %index,
            attribute = %split.attribute,
            threshold = %split.threshold,
            gain = split.gain,
            "node split"
        );
        tree.nodes[index.index()] = Some(Node::Decision(DecisionNode {
            attribute: split.attribute,
            threshold: split.threshold,
            impurity,
            depth,
            if_true,
            if_false,
        }));
        worklist.push(Pending {
            index: if_false,
            points: above,
            depth: depth + 1,
        });
        worklist.push(Pending {
            index: if_true,
            points: below,
            depth: depth + 1,
        });
    }

    debug!(
        n_nodes = tree.n_nodes(),
        n_leaves = tree.n_leaves(),
        depth = tree.depth(),
        "decision tree built"
    );

    if config.prune {
        let collapsed = tree.prune();
        info!(collapsed, n_leaves = tree.n_leaves(), "tree pruned");
    }

    Ok(tree)
}

/// Highest-gain threshold over all attributes; ties keep the lowest attribute.
fn best_split(
    config: &TreeConfig,
    points: &[usize],
    dataset: &Dataset,
    global: Impurity,
) -> Result<Option<AttributeSplit>, TreeError> {
    let mut best: Option<AttributeSplit> = None;
    for a in 0..dataset.n_attributes() {
        let attribute = AttributeIndex::new(a);
        let candidate = match &config.split_method {
            SplitMethod::Exact => exact_threshold(
                attribute,
                points,
                dataset,
                global,
                config.removal_coeff,
                config.gain_weighting,
            ),
            SplitMethod::Histogram(histogram) => histogram_threshold(
                attribute,
                points,
                dataset,
                global,
                histogram,
                config.gain_weighting,
            )?,
        };
        if let Some(candidate) = candidate
            && best.is_none_or(|b| candidate.gain > b.gain)
        {
            best = Some(candidate);
        }
    }
    Ok(best)
}

impl TrainingTree {
    fn reserve(&mut self) -> NodeIndex {
        self.nodes.push(None);
        NodeIndex::new(self.nodes.len() - 1)
    }

    /// Classify one point by walking from the root.
    ///
    /// At each decision node the true branch is taken when
    /// `values[attribute] < threshold`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::UntrainedTree`] | the tree has no root |
    /// | [`TreeError::AttributeCountMismatch`] | `values` has the wrong length |
    pub fn classify(&self, values: &[f64]) -> Result<ClassLabel, TreeError> {
        if self.nodes.first().is_none_or(Option::is_none) {
            return Err(TreeError::UntrainedTree);
        }
        if values.len() != self.n_attributes {
            return Err(TreeError::AttributeCountMismatch {
                expected: self.n_attributes,
                got: values.len(),
            });
        }

        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Some(Node::Final(leaf)) => return Ok(leaf.class),
                Some(Node::Decision(d)) => {
                    idx = if d.threshold.is_below(values[d.attribute.index()]) {
                        d.if_true.index()
                    } else {
                        d.if_false.index()
                    };
                }
                None => unreachable!("decision nodes only point at live children"),
            }
        }
    }

    /// Classify every labelled point of `dataset` and tally the results.
    ///
    /// Unlabelled points are skipped.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::UntrainedTree`] | the tree has no root |
    /// | [`TreeError::AttributeCountMismatch`] | the dataset has the wrong width |
    /// | [`TreeError::NothingToClassify`] | no labelled point in `dataset` |
    pub fn classify_dataset(&self, dataset: &Dataset) -> Result<Classification, TreeError> {
        let mut confusion = ConfusionMatrix::new(self.n_classes.max(dataset.class_span()));
        for point in dataset.points() {
            let Some(truth) = point.class() else {
                continue;
            };
            let predicted = self.classify(point.values())?;
            confusion.add(truth, predicted)?;
        }
        if confusion.total() == 0 {
            return Err(TreeError::NothingToClassify);
        }
        let error_rate = confusion.error_rate();
        Ok(Classification {
            confusion,
            error_rate,
        })
    }

    /// Return the node at `index`, or `None` for a pruned or unknown slot.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.index()).and_then(Option::as_ref)
    }

    /// Iterate over live nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeIndex::new(i), n)))
    }

    /// Return every edge, true branch first for each decision node.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.nodes()
            .filter_map(|(from, node)| match node {
                Node::Decision(d) => Some([
                    Edge {
                        from,
                        to: d.if_true,
                        is_true_branch: true,
                    },
                    Edge {
                        from,
                        to: d.if_false,
                        is_true_branch: false,
                    },
                ]),
                Node::Final(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Return the role of the node at `index`, or `None` for an empty slot.
    #[must_use]
    pub fn role(&self, index: NodeIndex) -> Option<NodeRole> {
        self.node(index).map(|node| match node {
            Node::Final(_) => NodeRole::Final,
            Node::Decision(_) if index.index() == 0 => NodeRole::Root,
            Node::Decision(_) => NodeRole::Decision,
        })
    }

    /// Return the number of live nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes().count()
    }

    /// Return the number of edges (two per decision node).
    #[must_use]
    pub fn n_edges(&self) -> usize {
        2 * self.nodes().filter(|(_, n)| !n.is_final()).count()
    }

    /// Return the number of final nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes().filter(|(_, n)| n.is_final()).count()
    }

    /// Return the depth of the deepest node. A lone root has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes().map(|(_, n)| n.depth()).max().unwrap_or(0)
    }

    /// Return the number of attributes the tree was trained on.
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.n_attributes
    }

    /// Return one past the highest class label seen in training.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Point;
    use crate::histogram::HistogramConfig;

    fn separable() -> Dataset {
        Dataset::from_rows(
            &[
                vec![1.0, 0.0],
                vec![2.0, 0.0],
                vec![3.0, 0.0],
                vec![10.0, 0.0],
                vec![11.0, 0.0],
                vec![12.0, 0.0],
            ],
            &[0, 0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    /// Four well separated quadrants, classes 0..=3.
    fn quadrants() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (qx, qy, class) in [(0.0, 0.0, 0), (10.0, 0.0, 1), (0.0, 10.0, 2), (10.0, 10.0, 3)] {
            for i in 0..6 {
                let offset = i as f64 * 0.5;
                rows.push(vec![qx + offset, qy + 2.5 - offset]);
                labels.push(class);
            }
        }
        Dataset::from_rows(&rows, &labels).unwrap()
    }

    // --- Preconditions ---

    #[test]
    fn zero_attributes_error() {
        let ds = Dataset::from_rows(&[vec![], vec![]], &[0, 1]).unwrap();
        let err = TreeConfig::new().fit(&ds).unwrap_err();
        assert!(matches!(err, TreeError::ZeroAttributes));
    }

    #[test]
    fn too_few_labelled_points_error() {
        let mut ds = Dataset::new(1);
        ds.add_point(Point::new(vec![1.0], ClassLabel::new(0))).unwrap();
        ds.add_point(Point::unlabelled(vec![2.0])).unwrap();
        let err = TreeConfig::new().fit(&ds).unwrap_err();
        assert!(matches!(err, TreeError::TooFewPoints { n_points: 1 }));
    }

    #[test]
    fn invalid_config_rejected_at_fit() {
        let err = TreeConfig::new()
            .with_removal_coeff(2.0)
            .fit(&separable())
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidRemovalCoeff { .. }));
    }

    #[test]
    fn untrained_tree_error() {
        let tree = TrainingTree::default();
        assert!(matches!(tree.classify(&[1.0]), Err(TreeError::UntrainedTree)));
    }

    #[test]
    fn attribute_mismatch_error() {
        let tree = TreeConfig::new().with_min_points(1).fit(&separable()).unwrap();
        let err = tree.classify(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            TreeError::AttributeCountMismatch { expected: 2, got: 1 }
        ));
    }

    // --- Induction ---

    #[test]
    fn pure_dataset_single_leaf() {
        let ds = Dataset::from_rows(&[vec![1.0], vec![3.0], vec![5.0]], &[2, 2, 2]).unwrap();
        let tree = TreeConfig::new().fit(&ds).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_edges(), 0);
        assert_eq!(tree.role(NodeIndex::new(0)), Some(NodeRole::Final));
        match tree.node(NodeIndex::new(0)) {
            Some(Node::Final(leaf)) => {
                assert_eq!(leaf.stop, StopReason::Pure);
                assert_eq!(leaf.class, ClassLabel::new(2));
            }
            other => panic!("expected final root, got {other:?}"),
        }
    }

    #[test]
    fn separable_split_at_midpoint() {
        let tree = TreeConfig::new().with_min_points(1).fit(&separable()).unwrap();
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.role(NodeIndex::new(0)), Some(NodeRole::Root));
        match tree.node(NodeIndex::new(0)) {
            Some(Node::Decision(d)) => {
                assert_eq!(d.attribute, AttributeIndex::new(0));
                assert!((d.threshold.value() - 6.5).abs() < f64::EPSILON);
            }
            other => panic!("expected decision root, got {other:?}"),
        }
        assert_eq!(tree.classify(&[2.0, 0.0]).unwrap(), ClassLabel::new(0));
        assert_eq!(tree.classify(&[11.0, 0.0]).unwrap(), ClassLabel::new(1));
    }

    #[test]
    fn balance_guard_stops_split() {
        let tree = TreeConfig::new().with_min_points(4).fit(&separable()).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        match tree.node(NodeIndex::new(0)) {
            Some(Node::Final(leaf)) => assert_eq!(leaf.stop, StopReason::Unbalanced),
            other => panic!("expected final root, got {other:?}"),
        }
    }

    #[test]
    fn constant_attributes_give_no_threshold() {
        let ds = Dataset::from_rows(&[vec![1.0], vec![1.0], vec![1.0], vec![1.0]], &[0, 1, 0, 1])
            .unwrap();
        let tree = TreeConfig::new().fit(&ds).unwrap();
        match tree.node(NodeIndex::new(0)) {
            Some(Node::Final(leaf)) => {
                assert_eq!(leaf.stop, StopReason::NoThreshold);
                assert_eq!(leaf.class, ClassLabel::new(0));
            }
            other => panic!("expected final root, got {other:?}"),
        }
    }

    #[test]
    fn max_depth_zero_splits_root_once() {
        let tree = TreeConfig::new()
            .with_min_points(1)
            .with_max_depth(0)
            .fit(&quadrants())
            .unwrap();
        assert_eq!(tree.depth(), 1);
        for (_, node) in tree.nodes() {
            if let Node::Final(leaf) = node {
                assert_eq!(leaf.stop, StopReason::MaxDepth);
            }
        }
    }

    #[test]
    fn children_follow_parents_and_edges_match() {
        let tree = TreeConfig::new().with_min_points(1).fit(&quadrants()).unwrap();
        let edges = tree.edges();
        assert_eq!(edges.len(), tree.n_edges());
        assert_eq!(tree.n_nodes(), tree.n_edges() + 1);
        for edge in &edges {
            assert!(edge.to > edge.from);
            assert!(tree.node(edge.to).is_some());
        }
        assert_eq!(edges.iter().filter(|e| e.is_true_branch).count(), edges.len() / 2);
    }

    #[test]
    fn near_zero_training_error() {
        let ds = quadrants();
        let tree = TreeConfig::new()
            .with_min_points(1)
            .with_removal_coeff(0.0)
            .fit(&ds)
            .unwrap();
        let result = tree.classify_dataset(&ds).unwrap();
        assert!(result.error_rate < 1e-9, "error_rate = {}", result.error_rate);
        assert_eq!(result.confusion.total(), ds.len());
    }

    #[test]
    fn histogram_search_separates() {
        let tree = TreeConfig::new()
            .with_min_points(1)
            .with_split_method(SplitMethod::Histogram(HistogramConfig::new().with_n_bins(8)))
            .fit(&separable())
            .unwrap();
        assert_eq!(tree.classify(&[2.0, 0.0]).unwrap(), ClassLabel::new(0));
        assert_eq!(tree.classify(&[11.0, 0.0]).unwrap(), ClassLabel::new(1));
    }

    #[test]
    fn leaves_partition_labelled_points() {
        let mut ds = quadrants();
        ds.add_point(Point::unlabelled(vec![5.0, 5.0])).unwrap();
        let tree = TreeConfig::new().fit(&ds).unwrap();
        let mut seen: Vec<usize> = tree
            .nodes()
            .filter_map(|(_, n)| match n {
                Node::Final(leaf) => Some(leaf.points.clone()),
                Node::Decision(_) => None,
            })
            .flatten()
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, ds.labelled_indices());
    }

    // --- Classification ---

    #[test]
    fn traversal_always_reaches_final() {
        let tree = TreeConfig::new().fit(&quadrants()).unwrap();
        for x in -5..20 {
            for y in -5..20 {
                let class = tree.classify(&[x as f64, y as f64]).unwrap();
                assert!(class.index() < 4);
            }
        }
    }

    #[test]
    fn classify_dataset_skips_unlabelled() {
        let mut ds = separable();
        ds.add_point(Point::unlabelled(vec![2.0, 0.0])).unwrap();
        let tree = TreeConfig::new().with_min_points(1).fit(&ds).unwrap();
        let result = tree.classify_dataset(&ds).unwrap();
        assert_eq!(result.confusion.total(), 6);
        assert!((result.error_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn classify_dataset_without_labels_errors() {
        let tree = TreeConfig::new().with_min_points(1).fit(&separable()).unwrap();
        let mut ds = Dataset::new(2);
        ds.add_point(Point::unlabelled(vec![1.0, 0.0])).unwrap();
        assert!(matches!(
            tree.classify_dataset(&ds),
            Err(TreeError::NothingToClassify)
        ));
    }

    #[test]
    fn classify_dataset_widens_matrix_for_unseen_classes() {
        let tree = TreeConfig::new().with_min_points(1).fit(&separable()).unwrap();
        let test = Dataset::from_rows(&[vec![1.0, 0.0], vec![12.0, 0.0]], &[4, 1]).unwrap();
        let result = tree.classify_dataset(&test).unwrap();
        assert_eq!(result.confusion.n_classes(), 5);
        assert!((result.error_rate - 0.5).abs() < f64::EPSILON);
    }
}
