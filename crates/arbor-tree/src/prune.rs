//! Collapse of depth-limited sibling leaves.

use tracing::trace;

use crate::impurity::{dominant_from_votes, gini_from_votes};
use crate::node::{FinalNode, Node, StopReason};
use crate::tree::TrainingTree;

impl TrainingTree {
    /// Replace every decision node whose two children are both final nodes
    /// stopped by the depth limit with a single final node.
    ///
    /// The new node holds the union of the children's points and their
    /// majority class, and is tagged [`StopReason::Pruned`]. The children's
    /// slots become empty. This is a single bottom-up pass: a node collapsed
    /// here does not make its own parent eligible.
    ///
    /// Returns the number of collapsed decision nodes.
    pub fn prune(&mut self) -> usize {
        let mut collapsed = 0;
        for idx in (0..self.nodes.len()).rev() {
            let Some(Node::Decision(decision)) = &self.nodes[idx] else {
                continue;
            };
            let (t, f, depth) = (
                decision.if_true.index(),
                decision.if_false.index(),
                decision.depth,
            );

            let merged = match (&self.nodes[t], &self.nodes[f]) {
                (Some(Node::Final(a)), Some(Node::Final(b)))
                    if a.stop == StopReason::MaxDepth && b.stop == StopReason::MaxDepth =>
                {
                    merge_leaves(a, b, depth)
                }
                _ => continue,
            };

            trace!(node = idx, class = %merged.class, "collapsing depth-limited leaves");
            self.nodes[t] = None;
            self.nodes[f] = None;
            self.nodes[idx] = Some(Node::Final(merged));
            collapsed += 1;
        }
        collapsed
    }
}

fn merge_leaves(a: &FinalNode, b: &FinalNode, depth: usize) -> FinalNode {
    let mut votes = a.votes.clone();
    for (&class, &count) in &b.votes {
        *votes.entry(class).or_insert(0) += count;
    }
    let mut points = a.points.clone();
    points.extend_from_slice(&b.points);

    let class = dominant_from_votes(&votes).map_or(a.class, |content| content.class);
    FinalNode {
        class,
        impurity: gini_from_votes(&votes, points.len()),
        depth,
        points,
        votes,
        stop: StopReason::Pruned,
    }
}
