//! Descriptive statistics of a dataset and outlier tagging.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::node::ClassLabel;

/// Summary of one attribute column.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeStats {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
    /// Median (mean of the two middle values for an even count).
    pub median: f64,
    /// Point counts of equal-width bins over `[min, max]`.
    pub histogram: Vec<usize>,
}

/// Summary of a whole dataset.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DatasetStats {
    /// Number of points, labelled or not.
    pub n_points: usize,
    /// Number of labelled points.
    pub n_labelled: usize,
    /// Labelled points per class.
    pub class_counts: BTreeMap<ClassLabel, usize>,
    /// One entry per attribute, in column order.
    pub attributes: Vec<AttributeStats>,
}

impl AttributeStats {
    fn compute(mut values: Vec<f64>, n_bins: usize) -> Self {
        values.sort_unstable_by(f64::total_cmp);
        let n = values.len();
        let min = values[0];
        let max = values[n - 1];
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        } else {
            values[n / 2]
        };

        let mut histogram = vec![0; n_bins];
        let width = (max - min) / n_bins as f64;
        for v in &values {
            let bin = if width > 0.0 {
                (((v - min) / width) as usize).min(n_bins - 1)
            } else {
                0
            };
            histogram[bin] += 1;
        }

        Self {
            min,
            max,
            mean,
            stddev: variance.sqrt(),
            median,
            histogram,
        }
    }

    /// `true` when `value` lies outside `mean ± k·stddev`.
    #[must_use]
    pub fn is_outlier(&self, value: f64, k: f64) -> bool {
        (value - self.mean).abs() > k * self.stddev
    }
}

impl DatasetStats {
    /// Compute per-attribute statistics over every point of `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::InvalidBinCount`] | `n_bins` is zero |
    /// | [`TreeError::TooFewPoints`] | the dataset is empty |
    #[instrument(skip(dataset), fields(n_points = dataset.len()))]
    pub fn compute(dataset: &Dataset, n_bins: usize) -> Result<Self, TreeError> {
        if n_bins == 0 {
            return Err(TreeError::InvalidBinCount { n_bins });
        }
        if dataset.is_empty() {
            return Err(TreeError::TooFewPoints { n_points: 0 });
        }

        let attributes = (0..dataset.n_attributes())
            .map(|a| {
                let values = dataset.points().iter().map(|p| p.value(a)).collect();
                AttributeStats::compute(values, n_bins)
            })
            .collect();
        let class_counts = dataset.class_counts();

        Ok(Self {
            n_points: dataset.len(),
            n_labelled: class_counts.values().sum(),
            class_counts,
            attributes,
        })
    }
}

/// Remove the label of every point having an attribute outside
/// `mean ± k·stddev`, and return how many points were tagged.
///
/// Points already unlabelled are left alone and not counted.
pub fn tag_outliers(dataset: &mut Dataset, stats: &DatasetStats, k: f64) -> usize {
    let mut n_tagged = 0;
    for point in dataset.points_mut() {
        if point.class().is_none() {
            continue;
        }
        let outlier = stats
            .attributes
            .iter()
            .zip(point.values())
            .any(|(s, &v)| s.is_outlier(v, k));
        if outlier {
            point.clear_class();
            n_tagged += 1;
        }
    }
    debug!(n_tagged, k, "outliers tagged");
    n_tagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Point;

    fn column(values: &[f64]) -> Dataset {
        let rows: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
        let labels = vec![0; values.len()];
        Dataset::from_rows(&rows, &labels).unwrap()
    }

    #[test]
    fn basic_statistics() {
        let ds = column(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let stats = DatasetStats::compute(&ds, 4).unwrap();
        let a = &stats.attributes[0];
        assert!((a.min - 2.0).abs() < f64::EPSILON);
        assert!((a.max - 9.0).abs() < f64::EPSILON);
        assert!((a.mean - 5.0).abs() < 1e-12);
        assert!((a.stddev - 2.0).abs() < 1e-12);
        assert!((a.median - 4.5).abs() < 1e-12);
        assert_eq!(a.histogram.iter().sum::<usize>(), 8);
        assert_eq!(a.histogram[3], 1);
    }

    #[test]
    fn odd_count_median() {
        let ds = column(&[3.0, 1.0, 2.0]);
        let stats = DatasetStats::compute(&ds, 2).unwrap();
        assert!((stats.attributes[0].median - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn constant_column_single_bin() {
        let ds = column(&[1.0, 1.0, 1.0]);
        let stats = DatasetStats::compute(&ds, 3).unwrap();
        assert_eq!(stats.attributes[0].histogram, vec![3, 0, 0]);
        assert!((stats.attributes[0].stddev - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn class_counts_and_labelled() {
        let mut ds = column(&[1.0, 2.0]);
        ds.add_point(Point::unlabelled(vec![3.0])).unwrap();
        let stats = DatasetStats::compute(&ds, 2).unwrap();
        assert_eq!(stats.n_points, 3);
        assert_eq!(stats.n_labelled, 2);
        assert_eq!(stats.class_counts[&ClassLabel::new(0)], 2);
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(
            DatasetStats::compute(&column(&[1.0]), 0),
            Err(TreeError::InvalidBinCount { n_bins: 0 })
        ));
        assert!(matches!(
            DatasetStats::compute(&Dataset::new(1), 3),
            Err(TreeError::TooFewPoints { n_points: 0 })
        ));
    }

    #[test]
    fn outliers_lose_their_label() {
        let mut values = vec![10.0; 20];
        values.push(100.0);
        let mut ds = column(&values);
        let stats = DatasetStats::compute(&ds, 5).unwrap();

        let n_tagged = tag_outliers(&mut ds, &stats, 3.0);
        assert_eq!(n_tagged, 1);
        assert!(ds.point(20).class().is_none());
        assert_eq!(ds.labelled_indices().len(), 20);

        // A second pass with the same statistics finds nothing new.
        assert_eq!(tag_outliers(&mut ds, &stats, 3.0), 0);
    }
}
