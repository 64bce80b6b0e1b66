//! Gini impurity and majority vote over a subset of points.

use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::node::{ClassLabel, Impurity};

/// Number of points per class, in ascending label order.
pub type ClassVotes = BTreeMap<ClassLabel, usize>;

/// Majority vote summary of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContent {
    /// The class holding the most votes (lowest label on ties).
    pub class: ClassLabel,
    /// Number of points of the dominant class.
    pub n_dominant: usize,
    /// Number of points of every other class.
    pub n_others: usize,
    /// Number of distinct classes present.
    pub n_classes: usize,
}

/// Tally the class labels of the points at `indices`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`TreeError::EmptyIndexSet`] | `indices` is empty |
/// | [`TreeError::UnlabelledPoint`] | an index refers to an unlabelled point |
pub fn class_votes(indices: &[usize], dataset: &Dataset) -> Result<ClassVotes, TreeError> {
    if indices.is_empty() {
        return Err(TreeError::EmptyIndexSet);
    }
    let mut votes = ClassVotes::new();
    for &index in indices {
        let class = dataset
            .point(index)
            .class()
            .ok_or(TreeError::UnlabelledPoint { index })?;
        *votes.entry(class).or_insert(0) += 1;
    }
    Ok(votes)
}

/// Gini impurity `1 - Σ (votes[c] / n)²` of an already tallied point set.
///
/// Returns zero when `n` is zero.
#[must_use]
pub fn gini_from_votes(votes: &ClassVotes, n: usize) -> Impurity {
    if n == 0 {
        return Impurity::new(0.0);
    }
    let n = n as f64;
    let sum_sq: f64 = votes
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    Impurity::new(1.0 - sum_sq)
}

/// Gini impurity of the points at `indices`, with the votes it was computed from.
///
/// # Errors
///
/// Same as [`class_votes`].
pub fn gini_impurity(
    indices: &[usize],
    dataset: &Dataset,
) -> Result<(Impurity, ClassVotes), TreeError> {
    let votes = class_votes(indices, dataset)?;
    let impurity = gini_from_votes(&votes, indices.len());
    Ok((impurity, votes))
}

/// Majority vote over already tallied votes.
///
/// Returns `None` for an empty tally.
#[must_use]
pub fn dominant_from_votes(votes: &ClassVotes) -> Option<NodeContent> {
    let total: usize = votes.values().sum();
    let mut best: Option<(ClassLabel, usize)> = None;
    for (&class, &count) in votes {
        // Strict comparison keeps the lowest label on ties.
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((class, count));
        }
    }
    best.map(|(class, n_dominant)| NodeContent {
        class,
        n_dominant,
        n_others: total - n_dominant,
        n_classes: votes.len(),
    })
}

/// Majority vote over the points at `indices`.
///
/// # Errors
///
/// Same as [`class_votes`].
pub fn dominant_class(indices: &[usize], dataset: &Dataset) -> Result<NodeContent, TreeError> {
    let votes = class_votes(indices, dataset)?;
    dominant_from_votes(&votes).ok_or(TreeError::EmptyIndexSet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Point;

    /// Four attributes, classes [0, 0, 0, 1, 1].
    fn vote_dataset() -> Dataset {
        Dataset::from_rows(
            &[
                vec![1.0, 4.0, 9.0, 2.0],
                vec![7.0, 8.0, 9.0, 1.0],
                vec![4.0, 6.0, 5.0, 1.0],
                vec![8.0, 8.0, 5.0, 2.0],
                vec![7.0, 8.0, 5.0, 9.0],
            ],
            &[0, 0, 0, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn majority_over_all_points() {
        let ds = vote_dataset();
        let nc = dominant_class(&[0, 1, 2, 3, 4], &ds).unwrap();
        assert_eq!(nc.class, ClassLabel::new(0));
        assert_eq!(nc.n_others, 2);
        assert_eq!(nc.n_classes, 2);
    }

    #[test]
    fn majority_over_subset() {
        let ds = vote_dataset();
        let nc = dominant_class(&[0, 3, 4], &ds).unwrap();
        assert_eq!(nc.class, ClassLabel::new(1));
        assert_eq!(nc.n_others, 1);
        assert_eq!(nc.n_dominant + nc.n_others, 3);
    }

    #[test]
    fn tie_goes_to_lowest_label() {
        let ds = vote_dataset();
        let nc = dominant_class(&[0, 3], &ds).unwrap();
        assert_eq!(nc.class, ClassLabel::new(0));
        assert_eq!(nc.n_dominant, 1);
    }

    #[test]
    fn empty_set_is_an_error() {
        let ds = vote_dataset();
        assert!(matches!(class_votes(&[], &ds), Err(TreeError::EmptyIndexSet)));
        assert!(matches!(gini_impurity(&[], &ds), Err(TreeError::EmptyIndexSet)));
        assert!(matches!(dominant_class(&[], &ds), Err(TreeError::EmptyIndexSet)));
    }

    #[test]
    fn unlabelled_point_is_an_error() {
        let mut ds = Dataset::new(1);
        ds.add_point(Point::new(vec![1.0], ClassLabel::new(0))).unwrap();
        ds.add_point(Point::unlabelled(vec![2.0])).unwrap();
        assert!(matches!(
            class_votes(&[0, 1], &ds),
            Err(TreeError::UnlabelledPoint { index: 1 })
        ));
    }

    #[test]
    fn gini_pure_is_zero() {
        let ds = vote_dataset();
        let (g, votes) = gini_impurity(&[0, 1, 2], &ds).unwrap();
        assert!(g.value().abs() < f64::EPSILON);
        assert_eq!(votes.len(), 1);
    }

    #[test]
    fn gini_binary_balanced() {
        let ds = vote_dataset();
        let (g, _) = gini_impurity(&[0, 1, 3, 4], &ds).unwrap();
        assert!((g.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_three_class_uniform() {
        let votes = ClassVotes::from([
            (ClassLabel::new(0), 100),
            (ClassLabel::new(1), 100),
            (ClassLabel::new(2), 100),
        ]);
        let g = gini_from_votes(&votes, 300);
        assert!((g.value() - (1.0 - 3.0 * (1.0 / 3.0_f64).powi(2))).abs() < 1e-10);
    }

    #[test]
    fn gini_stays_in_unit_interval() {
        let ds = vote_dataset();
        let subsets: [&[usize]; 5] = [&[0], &[3, 4], &[0, 3], &[0, 1, 3], &[0, 1, 2, 3, 4]];
        for subset in subsets {
            let (g, votes) = gini_impurity(subset, &ds).unwrap();
            assert!((0.0..1.0).contains(&g.value()), "gini = {}", g.value());
            assert_eq!(g.value() == 0.0, votes.len() == 1);
        }
    }
}
