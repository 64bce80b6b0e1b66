//! Graphviz export of trained trees.

use std::path::Path;

use arbor_tree::{ClassLabel, Node, TrainingTree};
use tracing::{info, instrument};

use crate::classes::ClassIndexMap;
use crate::IoError;

/// Render `tree` as a Graphviz `digraph`.
///
/// Decision nodes show `attribute < threshold`, final nodes the class, the
/// stop reason and the number of training points. Edges are labelled `T`
/// for the branch taken when the comparison holds and `F` otherwise.
/// Attributes missing from `attribute_names` are shown as `a<index>`.
#[must_use]
pub fn to_dot(
    tree: &TrainingTree,
    attribute_names: &[String],
    classes: Option<&ClassIndexMap>,
) -> String {
    let mut out = String::from("digraph tree {\n    node [shape=box];\n");

    for (index, node) in tree.nodes() {
        let line = match node {
            Node::Decision(d) => {
                let a = d.attribute.index();
                let name = attribute_names
                    .get(a)
                    .map_or_else(|| format!("a{a}"), |n| escape(n));
                format!(
                    "    n{index} [label=\"{name} < {}\\ngini={}\"];\n",
                    d.threshold, d.impurity
                )
            }
            Node::Final(f) => format!(
                "    n{index} [label=\"{}\\n{} ({} pts)\", shape=ellipse];\n",
                class_name(f.class, classes),
                f.stop,
                f.points.len()
            ),
        };
        out.push_str(&line);
    }

    for edge in tree.edges() {
        let tag = if edge.is_true_branch { 'T' } else { 'F' };
        out.push_str(&format!(
            "    n{} -> n{} [label=\"{tag}\"];\n",
            edge.from, edge.to
        ));
    }

    out.push_str("}\n");
    out
}

/// Write the Graphviz rendering of `tree` to `path`.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
#[instrument(skip(tree, attribute_names, classes), fields(path = %path.display()))]
pub fn write_dot(
    path: &Path,
    tree: &TrainingTree,
    attribute_names: &[String],
    classes: Option<&ClassIndexMap>,
) -> Result<(), IoError> {
    std::fs::write(path, to_dot(tree, attribute_names, classes)).map_err(|e| {
        IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    info!(n_nodes = tree.n_nodes(), "tree written");
    Ok(())
}

fn class_name(class: ClassLabel, classes: Option<&ClassIndexMap>) -> String {
    classes
        .and_then(|map| map.name(class))
        .map_or_else(|| format!("class {class}"), escape)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
