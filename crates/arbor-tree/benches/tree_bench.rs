//! Criterion benchmarks for arbor-tree: tree induction and classification.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_tree::{Dataset, HistogramConfig, SplitMethod, TreeConfig};

fn make_classification(
    n_points: usize,
    n_attributes: usize,
    n_classes: usize,
    seed: u64,
) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n_points);
    let mut labels = Vec::with_capacity(n_points);
    for i in 0..n_points {
        let class = i % n_classes;
        labels.push(class);
        let row: Vec<f64> = (0..n_attributes)
            .map(|a| {
                let base = if a < 3 { class as f64 * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 2.0
            })
            .collect();
        rows.push(row);
    }
    Dataset::from_rows(&rows, &labels).unwrap()
}

fn bench_fit_exact(c: &mut Criterion) {
    let ds = make_classification(500, 20, 5, 42);
    let cfg = TreeConfig::new();

    c.bench_function("tree_fit_exact_500x20_5class", |b| {
        b.iter(|| cfg.fit(&ds).unwrap());
    });
}

fn bench_fit_histogram(c: &mut Criterion) {
    let ds = make_classification(500, 20, 5, 42);
    let cfg = TreeConfig::new().with_split_method(SplitMethod::Histogram(HistogramConfig::new()));

    c.bench_function("tree_fit_histogram_500x20_5class", |b| {
        b.iter(|| cfg.fit(&ds).unwrap());
    });
}

fn bench_classify_dataset(c: &mut Criterion) {
    let ds = make_classification(500, 20, 5, 42);
    let tree = TreeConfig::new().fit(&ds).unwrap();

    c.bench_function("tree_classify_dataset_500x20", |b| {
        b.iter(|| tree.classify_dataset(&ds).unwrap());
    });
}

criterion_group!(benches, bench_fit_exact, bench_fit_histogram, bench_classify_dataset);
criterion_main!(benches);
