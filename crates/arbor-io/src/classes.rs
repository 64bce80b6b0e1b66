use std::collections::HashMap;

use arbor_tree::ClassLabel;

/// Mapping between class names found in a file and dense class labels.
///
/// Labels are handed out in order of first appearance, starting at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassIndexMap {
    names: Vec<String>,
    labels: HashMap<String, ClassLabel>,
}

impl ClassIndexMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the label of `name`, assigning the next free one if unseen.
    pub fn get_or_insert(&mut self, name: &str) -> ClassLabel {
        if let Some(&label) = self.labels.get(name) {
            return label;
        }
        let label = ClassLabel::new(self.names.len());
        self.names.push(name.to_string());
        self.labels.insert(name.to_string(), label);
        label
    }

    /// Return the label of a known name.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<ClassLabel> {
        self.labels.get(name).copied()
    }

    /// Return the name behind `label`.
    #[must_use]
    pub fn name(&self, label: ClassLabel) -> Option<&str> {
        self.names.get(label.index()).map(String::as_str)
    }

    /// Return all names, indexed by label.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the number of distinct classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` when no class was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_first_appearance() {
        let mut map = ClassIndexMap::new();
        assert_eq!(map.get_or_insert("setosa"), ClassLabel::new(0));
        assert_eq!(map.get_or_insert("virginica"), ClassLabel::new(1));
        assert_eq!(map.get_or_insert("setosa"), ClassLabel::new(0));
        assert_eq!(map.get_or_insert("versicolor"), ClassLabel::new(2));

        assert_eq!(map.len(), 3);
        assert_eq!(map.name(ClassLabel::new(1)), Some("virginica"));
        assert_eq!(map.label("versicolor"), Some(ClassLabel::new(2)));
        assert_eq!(map.label("unknown"), None);
        assert_eq!(map.name(ClassLabel::new(7)), None);
    }
}
