use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use arbor_io::{ClassPosition, DatasetReader, LoadedDataset, write_dot};
use arbor_tree::{
    ClassScores, CrossValidation, DatasetStats, FoldResult, GainWeighting, HistogramConfig,
    MaxDepthPolicy, SplitMethod, TreeConfig, tag_outliers,
};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Binary decision trees on continuous attributes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for fold shuffling
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// How the input file is laid out.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the input CSV file
    #[arg(long)]
    data: PathBuf,

    /// Field separator: a single character, "tab" or "space"
    #[arg(long, default_value = ",", value_parser = parse_separator)]
    separator: u8,

    /// The class is the first column (default: last)
    #[arg(long, default_value_t = false)]
    class_first: bool,

    /// Read class labels as names instead of integers
    #[arg(long, default_value_t = false)]
    class_as_string: bool,

    /// The first row holds column names
    #[arg(long, default_value_t = false)]
    header: bool,
}

/// Tree induction parameters.
#[derive(Args, Debug, Clone)]
struct TreeArgs {
    /// Maximum depth of a decision node
    #[arg(long, default_value_t = 10)]
    max_depth: usize,

    /// Minimum number of points on each side of a split
    #[arg(long, default_value_t = 3)]
    min_points: usize,

    /// Nodes with a Gini impurity below this value are not split
    #[arg(long, default_value_t = 0.05)]
    min_gini: f64,

    /// Candidate thresholds closer than this fraction of the range are merged
    #[arg(long, default_value_t = 0.05)]
    removal_coeff: f64,

    /// Search thresholds on a variable-bin-size histogram
    #[arg(long, default_value_t = false)]
    histogram: bool,

    /// Initial number of histogram bins
    #[arg(long, default_value_t = 15)]
    bins: usize,

    /// Maximum bisection depth of a histogram bin
    #[arg(long, default_value_t = 12)]
    histogram_max_depth: usize,

    /// Discard minority points of bins reaching the split depth limit
    #[arg(long, default_value_t = false)]
    discard_minority: bool,

    /// Child impurity averaging in the split gain: "even" or "by-size"
    #[arg(long, default_value = "even")]
    gain_weighting: String,

    /// Collapse sibling leaves stopped by the depth limit
    #[arg(long, default_value_t = false)]
    prune: bool,

    /// Unlabel points with an attribute outside mean ± k·stddev before training
    #[arg(long, default_value_t = false)]
    remove_outliers: bool,

    /// The k of the outlier rule
    #[arg(long, default_value_t = 3.0)]
    outlier_k: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Print a summary and per-attribute statistics of a dataset
    Info {
        #[command(flatten)]
        input: InputArgs,

        /// Number of bins of each attribute's value histogram
        #[arg(long, default_value_t = 15)]
        bins: usize,
    },

    /// Train a tree on the whole dataset and score it on the same points
    Train {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        tree: TreeArgs,

        /// Write the trained tree in Graphviz format to this path
        #[arg(long)]
        dot: Option<PathBuf>,
    },

    /// Estimate the error rate by k-fold cross-validation
    CrossValidate {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        tree: TreeArgs,

        /// Number of folds
        #[arg(long, default_value_t = 10)]
        folds: usize,

        /// Cut folds in file order instead of shuffling first
        #[arg(long, default_value_t = false)]
        no_shuffle: bool,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct InfoOutput {
    n_points: usize,
    n_labelled: usize,
    n_attributes: usize,
    attribute_names: Vec<String>,
    class_names: Vec<String>,
    stats: DatasetStats,
}

#[derive(Serialize)]
struct TrainOutput {
    n_points: usize,
    n_outliers: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    train_error: f64,
    confusion: Vec<Vec<usize>>,
    class_scores: Vec<ClassScores>,
}

#[derive(Serialize)]
struct CrossValidateOutput {
    n_points: usize,
    n_outliers: usize,
    n_folds: usize,
    mean_test_error: f64,
    std_test_error: f64,
    mean_train_error: f64,
    folds: Vec<FoldResult>,
    confusion: Vec<Vec<usize>>,
    class_scores: Vec<ClassScores>,
}

fn parse_separator(s: &str) -> Result<u8, String> {
    match s {
        "tab" => Ok(b'\t'),
        "space" => Ok(b' '),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("separator must be one ASCII character, got {s:?}")),
        },
    }
}

fn load(input: &InputArgs) -> Result<LoadedDataset> {
    let position = if input.class_first {
        ClassPosition::First
    } else {
        ClassPosition::Last
    };
    DatasetReader::new(&input.data)
        .with_separator(input.separator)
        .with_class_position(position)
        .with_header(input.header)
        .with_string_classes(input.class_as_string)
        .read()
        .with_context(|| format!("failed to read {}", input.data.display()))
}

fn parse_gain_weighting(s: &str) -> Result<GainWeighting> {
    match s {
        "even" => Ok(GainWeighting::Even),
        "by-size" => Ok(GainWeighting::BySize),
        other => anyhow::bail!("unknown gain weighting: {other} (expected even or by-size)"),
    }
}

fn build_config(args: &TreeArgs) -> Result<TreeConfig> {
    let split_method = if args.histogram {
        let policy = if args.discard_minority {
            MaxDepthPolicy::DiscardMinority
        } else {
            MaxDepthPolicy::TagNonSplittable
        };
        SplitMethod::Histogram(
            HistogramConfig::new()
                .with_n_bins(args.bins)
                .with_max_depth(args.histogram_max_depth)
                .with_policy(policy),
        )
    } else {
        SplitMethod::Exact
    };
    Ok(TreeConfig::new()
        .with_max_depth(args.max_depth)
        .with_min_points(args.min_points)
        .with_min_gini_for_split(args.min_gini)
        .with_removal_coeff(args.removal_coeff)
        .with_split_method(split_method)
        .with_gain_weighting(parse_gain_weighting(&args.gain_weighting)?)
        .with_pruning(args.prune))
}

/// Unlabel outliers when asked to, returning how many were tagged.
fn remove_outliers(loaded: &mut LoadedDataset, args: &TreeArgs) -> Result<usize> {
    if !args.remove_outliers {
        return Ok(0);
    }
    let stats = DatasetStats::compute(&loaded.dataset, args.bins)
        .context("failed to compute dataset statistics")?;
    let n_tagged = tag_outliers(&mut loaded.dataset, &stats, args.outlier_k);
    if n_tagged > 0 {
        warn!(n_tagged, k = args.outlier_k, "outliers removed from training");
    }
    Ok(n_tagged)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Info { input, bins } => {
            let loaded = load(&input)?;
            let stats = DatasetStats::compute(&loaded.dataset, bins)
                .context("failed to compute dataset statistics")?;

            let output = InfoOutput {
                n_points: stats.n_points,
                n_labelled: stats.n_labelled,
                n_attributes: loaded.dataset.n_attributes(),
                attribute_names: loaded.attribute_names,
                class_names: loaded.classes.names().to_vec(),
                stats,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Train { input, tree, dot } => {
            let mut loaded = load(&input)?;
            let n_outliers = remove_outliers(&mut loaded, &tree)?;

            let trained = build_config(&tree)?
                .fit(&loaded.dataset)
                .context("training failed")?;
            let scored = trained
                .classify_dataset(&loaded.dataset)
                .context("scoring on the training data failed")?;
            info!(
                n_leaves = trained.n_leaves(),
                train_error = scored.error_rate,
                "tree trained"
            );

            if let Some(path) = &dot {
                write_dot(
                    path,
                    &trained,
                    &loaded.attribute_names,
                    Some(&loaded.classes),
                )?;
            }

            let output = TrainOutput {
                n_points: loaded.dataset.len(),
                n_outliers,
                n_nodes: trained.n_nodes(),
                n_leaves: trained.n_leaves(),
                depth: trained.depth(),
                train_error: scored.error_rate,
                confusion: scored.confusion.as_rows().to_vec(),
                class_scores: scored.confusion.all_scores(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::CrossValidate {
            input,
            tree,
            folds,
            no_shuffle,
        } => {
            let mut loaded = load(&input)?;
            let n_outliers = remove_outliers(&mut loaded, &tree)?;

            let cv = CrossValidation::new(folds)?
                .with_seed(cli.seed)
                .with_shuffle(!no_shuffle);
            let result = cv
                .evaluate(&build_config(&tree)?, &loaded.dataset)
                .context("cross-validation failed")?;

            let output = CrossValidateOutput {
                n_points: result.n_points,
                n_outliers,
                n_folds: result.n_folds,
                mean_test_error: result.mean_test_error,
                std_test_error: result.std_test_error,
                mean_train_error: result.mean_train_error,
                class_scores: result.confusion.all_scores(),
                confusion: result.confusion.as_rows().to_vec(),
                folds: result.folds,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
