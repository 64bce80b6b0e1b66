//! Variable-bin-size histogram for approximate threshold search.
//!
//! The observed range of one attribute is cut into equal-width bins, bins
//! holding several classes are bisected until they are class-pure (or hit a
//! depth limit), and neighbouring bins that carry the same single class are
//! merged back. The boundaries that survive are the candidate thresholds.

use tracing::{debug, trace};

use crate::dataset::Dataset;
use crate::error::TreeError;
use crate::impurity::{ClassVotes, dominant_from_votes};
use crate::node::{AttributeIndex, ClassLabel, Impurity, Threshold};
use crate::threshold::{AttributeSplit, GainWeighting, best_candidate};

/// What happens to a bin that still holds several classes at the depth limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum MaxDepthPolicy {
    /// Keep every point and exclude the bin from further splitting.
    #[default]
    TagNonSplittable,
    /// Keep only the points of the dominant class and count the rest as discarded.
    DiscardMinority,
}

/// Parameters of the histogram search.
///
/// | Option | Default |
/// |---|---|
/// | `n_bins` | 15 |
/// | `max_depth` | 12 |
/// | `policy` | [`MaxDepthPolicy::TagNonSplittable`] |
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistogramConfig {
    n_bins: usize,
    max_depth: usize,
    policy: MaxDepthPolicy,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            n_bins: 15,
            max_depth: 12,
            policy: MaxDepthPolicy::TagNonSplittable,
        }
    }
}

impl HistogramConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of initial equal-width bins.
    #[must_use]
    pub fn with_n_bins(mut self, n_bins: usize) -> Self {
        self.n_bins = n_bins;
        self
    }

    /// Set the bisection depth limit of a single bin.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the policy applied at the depth limit.
    #[must_use]
    pub fn with_policy(mut self, policy: MaxDepthPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of initial bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Bisection depth limit.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Policy at the depth limit.
    #[must_use]
    pub fn policy(&self) -> MaxDepthPolicy {
        self.policy
    }

    pub(crate) fn validate(&self) -> Result<(), TreeError> {
        if self.n_bins == 0 {
            return Err(TreeError::InvalidBinCount {
                n_bins: self.n_bins,
            });
        }
        Ok(())
    }
}

/// One observation placed in a histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramEntry {
    /// Attribute value.
    pub value: f64,
    /// Class of the point.
    pub class: ClassLabel,
    /// Index of the point in its dataset.
    pub index: usize,
}

/// A `[start, end)` interval of the histogram and the entries inside it.
#[derive(Debug, Clone)]
pub struct HistogramBin {
    start: f64,
    end: f64,
    entries: Vec<HistogramEntry>,
    votes: ClassVotes,
    frozen: bool,
}

impl HistogramBin {
    fn empty(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            entries: Vec::new(),
            votes: ClassVotes::new(),
            frozen: false,
        }
    }

    fn push(&mut self, entry: HistogramEntry) {
        *self.votes.entry(entry.class).or_insert(0) += 1;
        self.entries.push(entry);
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Upper bound (exclusive, except for the last bin).
    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Entries inside the bin.
    #[must_use]
    pub fn entries(&self) -> &[HistogramEntry] {
        &self.entries
    }

    /// Per-class entry counts.
    #[must_use]
    pub fn votes(&self) -> &ClassVotes {
        &self.votes
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the bin holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct classes present.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.votes.len()
    }

    /// `true` when the bin was excluded from splitting.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// At least two points of two classes, not frozen.
    #[must_use]
    pub fn is_splittable(&self) -> bool {
        !self.frozen && self.entries.len() >= 2 && self.votes.len() >= 2
    }

    fn single_class(&self) -> Option<ClassLabel> {
        match self.votes.len() {
            1 => self.votes.keys().next().copied(),
            _ => None,
        }
    }

    fn bisect(self, mid: f64) -> (Self, Self) {
        let mut lower = Self::empty(self.start, mid);
        let mut upper = Self::empty(mid, self.end);
        for entry in self.entries {
            if entry.value < mid {
                lower.push(entry);
            } else {
                upper.push(entry);
            }
        }
        (lower, upper)
    }

    fn absorb(&mut self, other: Self) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        self.frozen |= other.frozen;
        for (class, count) in other.votes {
            *self.votes.entry(class).or_insert(0) += count;
        }
        self.entries.extend(other.entries);
    }

    /// Drop all entries but those of the dominant class and return how many went.
    fn keep_dominant(&mut self) -> usize {
        let Some(content) = dominant_from_votes(&self.votes) else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|e| e.class == content.class);
        self.votes.retain(|&class, _| class == content.class);
        before - self.entries.len()
    }
}

/// Ordered, gap-free partition of one attribute's observed range.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: Vec<HistogramBin>,
    max_depth: usize,
    policy: MaxDepthPolicy,
    n_discarded: usize,
}

impl Histogram {
    /// Place `entries` into `config.n_bins()` equal-width bins over their range.
    ///
    /// The last bin is closed on the right so the maximum value lands in it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::InvalidBinCount`] | `n_bins` is zero |
    /// | [`TreeError::ZeroWidthRange`] | fewer than two distinct values |
    pub fn build(entries: Vec<HistogramEntry>, config: &HistogramConfig) -> Result<Self, TreeError> {
        config.validate()?;
        let n_bins = config.n_bins();

        let (min, max) = entries.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), e| (lo.min(e.value), hi.max(e.value)),
        );
        if entries.is_empty() || min >= max {
            return Err(TreeError::ZeroWidthRange {
                value: if entries.is_empty() { 0.0 } else { min },
                n_points: entries.len(),
            });
        }

        let width = (max - min) / n_bins as f64;
        let mut bins: Vec<HistogramBin> = (0..n_bins)
            .map(|k| {
                let start = min + k as f64 * width;
                let end = if k == n_bins - 1 {
                    max
                } else {
                    min + (k + 1) as f64 * width
                };
                HistogramBin::empty(start, end)
            })
            .collect();

        for entry in entries {
            let mut k = (((entry.value - min) / width) as usize).min(n_bins - 1);
            // Rounding can land a value one bin off its borders.
            while k > 0 && entry.value < bins[k].start {
                k -= 1;
            }
            while k < n_bins - 1 && entry.value >= bins[k].end {
                k += 1;
            }
            bins[k].push(entry);
        }

        Ok(Self {
            bins,
            max_depth: config.max_depth(),
            policy: config.policy(),
            n_discarded: 0,
        })
    }

    /// Collect the labelled points at `indices` on `attribute` and build.
    ///
    /// # Errors
    ///
    /// Same as [`Histogram::build`].
    pub fn from_attribute(
        attribute: AttributeIndex,
        indices: &[usize],
        dataset: &Dataset,
        config: &HistogramConfig,
    ) -> Result<Self, TreeError> {
        Self::build(collect_entries(attribute, indices, dataset), config)
    }

    /// Bisect every splittable bin until no bin is splittable.
    pub fn split_search(&mut self) {
        loop {
            let mut changed = false;
            let bins = std::mem::take(&mut self.bins);
            for bin in bins {
                let before = self.bins.len();
                self.split_bin(bin, 0);
                changed |= self.bins.len() > before + 1;
            }
            if !changed {
                break;
            }
        }
    }

    fn split_bin(&mut self, mut bin: HistogramBin, depth: usize) {
        if !bin.is_splittable() {
            self.bins.push(bin);
            return;
        }
        if depth >= self.max_depth {
            match self.policy {
                MaxDepthPolicy::TagNonSplittable => bin.frozen = true,
                MaxDepthPolicy::DiscardMinority => self.n_discarded += bin.keep_dominant(),
            }
            self.bins.push(bin);
            return;
        }

        let mid = (bin.start + bin.end) / 2.0;
        if !(bin.start < mid && mid < bin.end) {
            trace!(start = bin.start, end = bin.end, "bin too narrow to bisect");
            bin.frozen = true;
            self.bins.push(bin);
            return;
        }

        let (lower, upper) = bin.bisect(mid);
        self.split_bin(lower, depth + 1);
        self.split_bin(upper, depth + 1);
    }

    /// Merge neighbours that share one class, and fold empty bins into a neighbour.
    pub fn merge_search(&mut self) {
        loop {
            let mut merged = false;
            let mut i = 0;
            while i + 1 < self.bins.len() {
                let (a, b) = (&self.bins[i], &self.bins[i + 1]);
                let same_class = matches!(
                    (a.single_class(), b.single_class()),
                    (Some(x), Some(y)) if x == y
                );
                if a.is_empty() || b.is_empty() || same_class {
                    let next = self.bins.remove(i + 1);
                    self.bins[i].absorb(next);
                    merged = true;
                } else {
                    i += 1;
                }
            }
            if !merged {
                break;
            }
        }
    }

    /// Boundaries between adjacent bins, left to right.
    ///
    /// Returns `None` when fewer than two bins remain.
    #[must_use]
    pub fn thresholds(&self) -> Option<Vec<Threshold>> {
        if self.bins.len() < 2 {
            return None;
        }
        Some(
            self.bins[..self.bins.len() - 1]
                .iter()
                .map(|b| Threshold::new(b.end))
                .collect(),
        )
    }

    /// Bins in ascending order.
    #[must_use]
    pub fn bins(&self) -> &[HistogramBin] {
        &self.bins
    }

    /// Number of bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.bins.iter().map(HistogramBin::len).sum()
    }

    /// Number of entries dropped by [`MaxDepthPolicy::DiscardMinority`].
    #[must_use]
    pub fn n_discarded(&self) -> usize {
        self.n_discarded
    }
}

fn collect_entries(
    attribute: AttributeIndex,
    indices: &[usize],
    dataset: &Dataset,
) -> Vec<HistogramEntry> {
    indices
        .iter()
        .filter_map(|&index| {
            let point = dataset.point(index);
            point.class().map(|class| HistogramEntry {
                value: point.value(attribute.index()),
                class,
                index,
            })
        })
        .collect()
}

/// Histogram-driven threshold search on `attribute` over the points at `indices`.
///
/// Returns `Ok(None)` when the values span no range or the histogram ends
/// with a single bin.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`TreeError::InvalidBinCount`] | `config` asks for zero bins |
pub fn histogram_threshold(
    attribute: AttributeIndex,
    indices: &[usize],
    dataset: &Dataset,
    global: Impurity,
    config: &HistogramConfig,
    weighting: GainWeighting,
) -> Result<Option<AttributeSplit>, TreeError> {
    config.validate()?;
    let entries = collect_entries(attribute, indices, dataset);
    let mut values = entries.iter().map(|e| e.value);
    let Some(first) = values.next() else {
        return Ok(None);
    };
    if values.all(|v| v == first) {
        return Ok(None);
    }

    let mut histogram = Histogram::build(entries, config)?;
    let n_points = histogram.n_points();
    histogram.split_search();
    histogram.merge_search();
    debug!(
        %attribute,
        n_points,
        n_bins = histogram.n_bins(),
        n_discarded = histogram.n_discarded(),
        "histogram built"
    );

    let Some(thresholds) = histogram.thresholds() else {
        return Ok(None);
    };
    let candidates: Vec<f64> = thresholds.iter().map(|t| t.value()).collect();
    Ok(best_candidate(
        attribute, indices, dataset, global, &candidates, weighting,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impurity::gini_impurity;

    fn entry(value: f64, class: usize, index: usize) -> HistogramEntry {
        HistogramEntry {
            value,
            class: ClassLabel::new(class),
            index,
        }
    }

    /// Values 0..n, class 0 below `cut`, class 1 from `cut` on.
    fn step_entries(n: usize, cut: usize) -> Vec<HistogramEntry> {
        (0..n)
            .map(|i| entry(i as f64, usize::from(i >= cut), i))
            .collect()
    }

    fn assert_adjacent(h: &Histogram) {
        for pair in h.bins().windows(2) {
            assert!((pair[0].end() - pair[1].start()).abs() < 1e-12);
            assert!(pair[0].start() < pair[0].end());
        }
    }

    // --- build ---

    #[test]
    fn build_conserves_points() {
        let h = Histogram::build(step_entries(37, 20), &HistogramConfig::new()).unwrap();
        assert_eq!(h.n_bins(), 15);
        assert_eq!(h.n_points(), 37);
        assert_adjacent(&h);
    }

    #[test]
    fn max_value_goes_to_last_bin() {
        let entries = vec![entry(0.0, 0, 0), entry(0.3, 0, 1), entry(1.0, 1, 2)];
        let h = Histogram::build(entries, &HistogramConfig::new().with_n_bins(4)).unwrap();
        let last = &h.bins()[3];
        assert_eq!(last.len(), 1);
        assert!((last.end() - 1.0).abs() < f64::EPSILON);
        assert!((h.bins()[1].entries()[0].value - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn entries_respect_bin_borders() {
        let entries: Vec<HistogramEntry> =
            (0..=30_usize).map(|i| entry(i as f64 * 0.1, i % 2, i)).collect();
        let h = Histogram::build(entries, &HistogramConfig::new().with_n_bins(7)).unwrap();
        let last = h.n_bins() - 1;
        for (k, bin) in h.bins().iter().enumerate() {
            for e in bin.entries() {
                assert!(e.value >= bin.start());
                assert!(e.value < bin.end() || (k == last && e.value <= bin.end()));
            }
        }
    }

    #[test]
    fn zero_bins_rejected() {
        let err = Histogram::build(step_entries(4, 2), &HistogramConfig::new().with_n_bins(0))
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidBinCount { n_bins: 0 }));
    }

    #[test]
    fn zero_width_range_rejected() {
        let entries = vec![entry(2.0, 0, 0), entry(2.0, 1, 1)];
        let err = Histogram::build(entries, &HistogramConfig::new()).unwrap_err();
        assert!(matches!(err, TreeError::ZeroWidthRange { n_points: 2, .. }));
    }

    // --- split search ---

    #[test]
    fn split_search_isolates_classes() {
        let config = HistogramConfig::new().with_n_bins(1);
        let mut h = Histogram::build(step_entries(10, 5), &config).unwrap();
        h.split_search();

        assert_eq!(h.n_points(), 10);
        assert_eq!(h.n_discarded(), 0);
        assert!(h.bins().iter().all(|b| !b.is_splittable()));
        assert!(h.bins().iter().all(|b| b.n_classes() <= 1));
        assert_adjacent(&h);
    }

    #[test]
    fn depth_limit_tags_bin() {
        let config = HistogramConfig::new().with_n_bins(1).with_max_depth(0);
        let mut h = Histogram::build(step_entries(6, 3), &config).unwrap();
        h.split_search();

        assert_eq!(h.n_bins(), 1);
        assert!(h.bins()[0].is_frozen());
        assert_eq!(h.n_points(), 6);
    }

    #[test]
    fn depth_limit_discards_minority() {
        let config = HistogramConfig::new()
            .with_n_bins(1)
            .with_max_depth(0)
            .with_policy(MaxDepthPolicy::DiscardMinority);
        let entries = vec![
            entry(0.0, 0, 0),
            entry(1.0, 0, 1),
            entry(2.0, 1, 2),
            entry(3.0, 0, 3),
        ];
        let mut h = Histogram::build(entries, &config).unwrap();
        let before = h.n_points();
        h.split_search();

        assert_eq!(h.n_discarded(), 1);
        assert_eq!(h.n_points() + h.n_discarded(), before);
        assert_eq!(h.bins()[0].n_classes(), 1);
    }

    #[test]
    fn interleaved_classes_stop_at_depth_limit() {
        // Alternating classes never become pure; the depth limit ends the search.
        let entries: Vec<HistogramEntry> =
            (0..64_usize).map(|i| entry(i as f64, i % 2, i)).collect();
        let config = HistogramConfig::new()
            .with_n_bins(2)
            .with_max_depth(3)
            .with_policy(MaxDepthPolicy::DiscardMinority);
        let mut h = Histogram::build(entries, &config).unwrap();
        h.split_search();

        assert_eq!(h.n_points() + h.n_discarded(), 64);
        assert!(h.bins().iter().all(|b| !b.is_splittable()));
        assert!(h.n_bins() <= 2 * (1 << 3));
    }

    // --- merge search ---

    #[test]
    fn merge_leaves_alternating_classes_and_no_empty_bins() {
        let config = HistogramConfig::new().with_n_bins(15);
        let mut h = Histogram::build(step_entries(40, 13), &config).unwrap();
        h.split_search();
        h.merge_search();

        assert_eq!(h.n_points(), 40);
        assert_adjacent(&h);
        assert!(h.bins().iter().all(|b| !b.is_empty()));
        for pair in h.bins().windows(2) {
            let same = matches!(
                (pair[0].single_class(), pair[1].single_class()),
                (Some(x), Some(y)) if x == y
            );
            assert!(!same);
        }
        assert_eq!(h.n_bins(), 2);
    }

    #[test]
    fn empty_bins_merge_into_neighbour() {
        let entries = vec![entry(0.0, 0, 0), entry(9.0, 1, 1), entry(10.0, 1, 2)];
        let mut h = Histogram::build(entries, &HistogramConfig::new().with_n_bins(5)).unwrap();
        h.merge_search();
        assert!(h.bins().iter().all(|b| !b.is_empty()));
        assert_eq!(h.n_bins(), 2);
        let thresholds = h.thresholds().unwrap();
        assert!((thresholds[0].value() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn single_bin_has_no_thresholds() {
        let entries = vec![entry(0.0, 1, 0), entry(5.0, 1, 1)];
        let mut h = Histogram::build(entries, &HistogramConfig::new()).unwrap();
        h.split_search();
        h.merge_search();
        assert_eq!(h.n_bins(), 1);
        assert!(h.thresholds().is_none());
    }

    // --- histogram_threshold ---

    #[test]
    fn histogram_threshold_separates_step() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let labels: Vec<usize> = (0..30).map(|i| usize::from(i >= 12)).collect();
        let ds = Dataset::from_rows(&rows, &labels).unwrap();
        let all: Vec<usize> = (0..30).collect();
        let global = gini_impurity(&all, &ds).unwrap().0;

        let split = histogram_threshold(
            AttributeIndex::new(0),
            &all,
            &ds,
            global,
            &HistogramConfig::new(),
            GainWeighting::Even,
        )
        .unwrap()
        .unwrap();

        assert_eq!(split.n_below, 12);
        assert!(split.threshold.value() > 11.0 && split.threshold.value() <= 12.0);
        assert!((split.gain - global.value()).abs() < 1e-12);
    }

    #[test]
    fn histogram_threshold_constant_attribute() {
        let ds = Dataset::from_rows(&[vec![1.0], vec![1.0], vec![1.0]], &[0, 1, 0]).unwrap();
        let all = [0, 1, 2];
        let global = gini_impurity(&all, &ds).unwrap().0;
        let split = histogram_threshold(
            AttributeIndex::new(0),
            &all,
            &ds,
            global,
            &HistogramConfig::new(),
            GainWeighting::Even,
        )
        .unwrap();
        assert!(split.is_none());
    }
}
