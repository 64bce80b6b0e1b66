//! In-memory dataset of labelled points.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::TreeError;
use crate::node::ClassLabel;

/// One row of a dataset: attribute values and an optional class label.
///
/// A point without a label is kept in the dataset but takes no part in
/// training or scoring.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    values: Vec<f64>,
    class: Option<ClassLabel>,
}

impl Point {
    /// Create a labelled point.
    #[must_use]
    pub fn new(values: Vec<f64>, class: ClassLabel) -> Self {
        Self {
            values,
            class: Some(class),
        }
    }

    /// Create a point with no class label.
    #[must_use]
    pub fn unlabelled(values: Vec<f64>) -> Self {
        Self {
            values,
            class: None,
        }
    }

    /// Return the value of one attribute.
    ///
    /// # Panics
    ///
    /// Panics if `attribute` is out of range.
    #[must_use]
    pub fn value(&self, attribute: usize) -> f64 {
        self.values[attribute]
    }

    /// Return all attribute values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the class label, if any.
    #[must_use]
    pub fn class(&self) -> Option<ClassLabel> {
        self.class
    }

    /// Return the number of attributes.
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn clear_class(&mut self) {
        self.class = None;
    }
}

/// An ordered collection of points sharing one attribute count.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Dataset {
    n_attributes: usize,
    points: Vec<Point>,
}

impl Dataset {
    /// Create an empty dataset whose points will have `n_attributes` values.
    #[must_use]
    pub fn new(n_attributes: usize) -> Self {
        Self {
            n_attributes,
            points: Vec::new(),
        }
    }

    /// Build a dataset from row-major values and labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::LabelCountMismatch`] | `rows` and `labels` differ in length |
    /// | [`TreeError::AttributeCountMismatch`] | rows have inconsistent lengths |
    /// | [`TreeError::NonFiniteValue`] | a value is NaN or infinite |
    pub fn from_rows(rows: &[Vec<f64>], labels: &[usize]) -> Result<Self, TreeError> {
        if rows.len() != labels.len() {
            return Err(TreeError::LabelCountMismatch {
                n_rows: rows.len(),
                n_labels: labels.len(),
            });
        }
        let n_attributes = rows.first().map_or(0, Vec::len);
        let mut dataset = Self::new(n_attributes);
        for (row, &label) in rows.iter().zip(labels) {
            dataset.add_point(Point::new(row.clone(), ClassLabel::new(label)))?;
        }
        Ok(dataset)
    }

    /// Append a point.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::AttributeCountMismatch`] | the point has the wrong number of values |
    /// | [`TreeError::NonFiniteValue`] | a value is NaN or infinite |
    pub fn add_point(&mut self, point: Point) -> Result<(), TreeError> {
        if point.n_attributes() != self.n_attributes {
            return Err(TreeError::AttributeCountMismatch {
                expected: self.n_attributes,
                got: point.n_attributes(),
            });
        }
        if let Some(attribute_index) = point.values.iter().position(|v| !v.is_finite()) {
            return Err(TreeError::NonFiniteValue {
                point_index: self.points.len(),
                attribute_index,
            });
        }
        self.points.push(point);
        Ok(())
    }

    /// Return the number of points, labelled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Return `true` when the dataset holds no point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Return the number of attributes per point.
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.n_attributes
    }

    /// Return the point at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn point(&self, index: usize) -> &Point {
        &self.points[index]
    }

    /// Return all points in order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }

    /// Return the indices of all labelled points, in order.
    #[must_use]
    pub fn labelled_indices(&self) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.class.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Return a copy holding only the labelled points, in order.
    #[must_use]
    pub fn labelled_only(&self) -> Dataset {
        Dataset {
            n_attributes: self.n_attributes,
            points: self
                .points
                .iter()
                .filter(|p| p.class.is_some())
                .cloned()
                .collect(),
        }
    }

    /// Return the number of points per class, ascending by label.
    #[must_use]
    pub fn class_counts(&self) -> BTreeMap<ClassLabel, usize> {
        let mut counts = BTreeMap::new();
        for class in self.points.iter().filter_map(Point::class) {
            *counts.entry(class).or_insert(0) += 1;
        }
        counts
    }

    /// Return the number of distinct class labels present.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_counts().len()
    }

    /// Return one past the highest label present, i.e. the dimension a
    /// confusion matrix needs to hold every class of this dataset.
    #[must_use]
    pub fn class_span(&self) -> usize {
        self.points
            .iter()
            .filter_map(Point::class)
            .map(|c| c.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Shuffle the points in place.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        self.points.shuffle(rng);
    }

    /// Split into a `(train, test)` pair for fold `index` of `n_folds`.
    ///
    /// The test fold is the contiguous slice `[index * s, (index + 1) * s)`
    /// with `s = len / n_folds`; the last fold also takes the remainder.
    /// The train fold is the complement, in original order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::InvalidFoldCount`] | `n_folds < 2` |
    /// | [`TreeError::InvalidFoldIndex`] | `index >= n_folds` |
    /// | [`TreeError::TooFewPointsForFolds`] | fewer points than folds |
    pub fn folds(&self, index: usize, n_folds: usize) -> Result<(Dataset, Dataset), TreeError> {
        if n_folds < 2 {
            return Err(TreeError::InvalidFoldCount { n_folds });
        }
        if index >= n_folds {
            return Err(TreeError::InvalidFoldIndex { index, n_folds });
        }
        if self.len() < n_folds {
            return Err(TreeError::TooFewPointsForFolds {
                n_points: self.len(),
                n_folds,
            });
        }

        let fold_size = self.len() / n_folds;
        let start = index * fold_size;
        let end = if index == n_folds - 1 {
            self.len()
        } else {
            start + fold_size
        };

        let mut train = Dataset::new(self.n_attributes);
        let mut test = Dataset::new(self.n_attributes);
        for (i, point) in self.points.iter().enumerate() {
            if (start..end).contains(&i) {
                test.points.push(point.clone());
            } else {
                train.points.push(point.clone());
            }
        }

        debug!(
            fold = index,
            n_folds,
            n_train = train.len(),
            n_test = test.len(),
            "dataset folded"
        );
        Ok((train, test))
    }
}
