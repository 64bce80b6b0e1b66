//! Threshold search on a single attribute.
//!
//! Candidates come either from the exact search below (midpoints between
//! distinct sorted values) or from a variable-bin-size histogram
//! ([`crate::histogram`]). Both are scored by [`best_candidate`], which
//! scans the sorted `(value, class)` pairs once while moving points from the
//! upper to the lower side.

use tracing::trace;

use crate::dataset::Dataset;
use crate::impurity::{ClassVotes, gini_from_votes};
use crate::node::{AttributeIndex, ClassLabel, Impurity, Threshold};

/// How the impurities of the two sides of a split are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum GainWeighting {
    /// Plain mean `(g_below + g_above) / 2`.
    #[default]
    Even,
    /// Mean weighted by side size `(n_below * g_below + n_above * g_above) / n`.
    BySize,
}

impl GainWeighting {
    fn average(self, g_below: f64, n_below: usize, g_above: f64, n_above: usize) -> f64 {
        match self {
            GainWeighting::Even => (g_below + g_above) / 2.0,
            GainWeighting::BySize => {
                let n = (n_below + n_above) as f64;
                (n_below as f64 * g_below + n_above as f64 * g_above) / n
            }
        }
    }
}

/// Best threshold found on one attribute.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeSplit {
    /// Attribute the threshold applies to.
    pub attribute: AttributeIndex,
    /// Impurity of the subset minus the averaged impurity of the two sides.
    pub gain: f64,
    /// Points with `value < threshold` go to the true branch.
    pub threshold: Threshold,
    /// Number of points below the threshold.
    pub n_below: usize,
}

/// Sort `values` and collapse near-duplicates in place.
///
/// A value is dropped when it equals, or lies less than
/// `removal_coeff * (max - min)` above, the last value kept. The range is
/// taken from the input before any removal.
pub fn remove_duplicates(values: &mut Vec<f64>, removal_coeff: f64) {
    values.sort_unstable_by(f64::total_cmp);
    let (Some(&min), Some(&max)) = (values.first(), values.last()) else {
        return;
    };
    let tolerance = removal_coeff * (max - min);
    values.dedup_by(|current, kept| *current == *kept || *current - *kept < tolerance);
}

/// Exhaustive threshold search on `attribute` over the points at `indices`.
///
/// Returns `None` when fewer than two distinct values survive
/// [`remove_duplicates`].
#[must_use]
pub fn exact_threshold(
    attribute: AttributeIndex,
    indices: &[usize],
    dataset: &Dataset,
    global: Impurity,
    removal_coeff: f64,
    weighting: GainWeighting,
) -> Option<AttributeSplit> {
    let mut values: Vec<f64> = indices
        .iter()
        .map(|&i| dataset.point(i).value(attribute.index()))
        .collect();
    remove_duplicates(&mut values, removal_coeff);
    if values.len() < 2 {
        trace!(%attribute, "no distinct values left");
        return None;
    }

    let candidates: Vec<f64> = values.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    best_candidate(attribute, indices, dataset, global, &candidates, weighting)
}

/// Score ascending `candidates` on `attribute` and return the first one with
/// the highest gain.
///
/// Candidates leaving one side empty are skipped. Unlabelled points are
/// ignored.
pub(crate) fn best_candidate(
    attribute: AttributeIndex,
    indices: &[usize],
    dataset: &Dataset,
    global: Impurity,
    candidates: &[f64],
    weighting: GainWeighting,
) -> Option<AttributeSplit> {
    let mut sorted: Vec<(f64, ClassLabel)> = indices
        .iter()
        .filter_map(|&i| {
            let point = dataset.point(i);
            point.class().map(|c| (point.value(attribute.index()), c))
        })
        .collect();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
    let n = sorted.len();

    let mut below = ClassVotes::new();
    let mut above = ClassVotes::new();
    for &(_, class) in &sorted {
        *above.entry(class).or_insert(0) += 1;
    }

    let mut cursor = 0;
    let mut best: Option<AttributeSplit> = None;
    for &candidate in candidates {
        let threshold = Threshold::new(candidate);
        while cursor < n && threshold.is_below(sorted[cursor].0) {
            let class = sorted[cursor].1;
            *below.entry(class).or_insert(0) += 1;
            if let Some(count) = above.get_mut(&class) {
                *count -= 1;
            }
            cursor += 1;
        }

        let n_below = cursor;
        let n_above = n - cursor;
        if n_below == 0 || n_above == 0 {
            continue;
        }

        let g_below = gini_from_votes(&below, n_below).value();
        let g_above = gini_from_votes(&above, n_above).value();
        let gain = global.value() - weighting.average(g_below, n_below, g_above, n_above);

        if best.is_none_or(|b| gain > b.gain) {
            best = Some(AttributeSplit {
                attribute,
                gain,
                threshold,
                n_below,
            });
        }
    }
    best
}
