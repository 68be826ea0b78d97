//! risklab CLI module
//!
//! Command-line interface for inspecting a dataset, running analytics,
//! training, and single-record prediction.

use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::analytics::{self, CorrelationMatrix, Histogram};
use crate::data::{Dataset, DEFAULT_DATA_PATH, DEFAULT_TARGET};
use crate::session::Session;
use crate::training::{TrainConfig, Trainer};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn truncate(s: &str, width: usize) -> &str {
    s.char_indices().nth(width).map_or(s, |(i, _)| &s[..i])
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "risklab")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Health-risk dataset pipeline: inspect, analyze, train, predict")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show table shape, detected task type, and per-column profile
    Info {
        /// Input CSV file
        #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = DEFAULT_TARGET)]
        target: String,
    },

    /// Summary statistics, target histogram, and correlation matrix
    Analyze {
        /// Input CSV file
        #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = DEFAULT_TARGET)]
        target: String,

        /// x column for an extra scatter view
        #[arg(long)]
        x: Option<String>,

        /// y column for an extra scatter view
        #[arg(long)]
        y: Option<String>,

        /// Emit the analytics as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Train a random forest and report metrics
    Train {
        /// Input CSV file
        #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = DEFAULT_TARGET)]
        target: String,

        /// Feature columns, comma separated (all numeric non-target
        /// columns when omitted)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,

        /// Fraction of rows held out for testing
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Seed for the split and the forest
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of trees
        #[arg(long, default_value_t = 100)]
        trees: usize,
    },

    /// Train, then predict one record from NAME=VALUE pairs
    Predict {
        /// Input CSV file
        #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = DEFAULT_TARGET)]
        target: String,

        /// Feature columns, comma separated (all numeric non-target
        /// columns when omitted)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,

        /// Fraction of rows held out for testing
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Seed for the split and the forest
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of trees
        #[arg(long, default_value_t = 100)]
        trees: usize,

        /// Feature values as NAME=VALUE pairs
        #[arg(value_name = "NAME=VALUE", required = true)]
        values: Vec<String>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &Path, target: &str) -> anyhow::Result<()> {
    section("Data Info");

    let dataset = Dataset::from_csv_path(data_path, target)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), dataset.n_rows());
    println!("  {:<12} {}", muted("Columns"), dataset.n_cols());
    println!("  {:<12} {}", muted("Target"), dataset.target());
    println!("  {:<12} {}", muted("Task"), accent(&dataset.task().to_string()));
    println!();

    println!(
        "  {:<20} {:<12} {:>6} {:>8}",
        muted("Column"),
        muted("Type"),
        muted("Nulls"),
        muted("Unique")
    );
    println!("  {}", dim(&"─".repeat(50)));
    for profile in dataset.column_profiles() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            truncate(&profile.name, 20),
            profile.dtype.truecolor(140, 140, 140),
            profile.nulls,
            profile.distinct,
        );
    }

    println!();
    Ok(())
}

pub fn cmd_analyze(
    data_path: &Path,
    target: &str,
    x: Option<&str>,
    y: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    if !json {
        section("Analyze");
        step_run("Loading data");
    }
    let start = Instant::now();
    let dataset = Dataset::from_csv_path(data_path, target)?;
    if !json {
        step_done(&format!(
            "{} rows × {} cols in {:?}",
            dataset.n_rows(),
            dataset.n_cols(),
            start.elapsed()
        ));
    }

    let summaries = analytics::column_summaries(dataset.df())?;
    let hist = analytics::target_distribution(dataset.df(), dataset.target())?;
    let corr = analytics::correlation(dataset.df())?;
    let scatter = match (x, y) {
        (Some(x_col), Some(y_col)) => {
            Some(analytics::scatter(dataset.df(), x_col, y_col, dataset.target())?)
        }
        _ => None,
    };

    if json {
        let payload = serde_json::json!({
            "task": dataset.task(),
            "summary": summaries,
            "histogram": hist,
            "correlation": corr,
            "scatter": scatter,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let view = analytics::overview(dataset.df())?;
    section("Head");
    println!("{}", view.head);

    section("Summary");
    println!("{}", view.summary);

    section(&format!("Distribution of {}", dataset.target()));
    print_histogram(&hist);

    section("Correlation");
    print_correlation(&corr);

    if let Some(points) = scatter {
        section(&format!("Scatter {} × {}", points.x_col, points.y_col));
        println!(
            "  {} points, colored by {}",
            points.points.len(),
            points.color_col
        );
        for point in points.points.iter().take(10) {
            let color = point
                .color
                .map_or("-".to_string(), |c| format!("{:.2}", c));
            println!("  {:>10.3} {:>10.3} {:>8}", point.x, point.y, dim(&color));
        }
        if points.points.len() > 10 {
            println!("  {}", dim("..."));
        }
    }

    println!();
    Ok(())
}

pub fn cmd_train(
    data_path: &Path,
    target: &str,
    features: &[String],
    test_fraction: f64,
    seed: u64,
    trees: usize,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let dataset = Dataset::from_csv_path(data_path, target)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        dataset.n_rows(),
        dataset.n_cols(),
        start.elapsed()
    ));

    let features = resolve_features(&dataset, features)?;
    let config = TrainConfig::new(features)
        .with_test_fraction(test_fraction)
        .with_random_seed(seed)
        .with_n_trees(trees);

    step_run(&format!("Training {} forest", dataset.task()));
    let start = Instant::now();
    let report = Trainer::new(config).fit(&dataset)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("{}", report.summary());
    Ok(())
}

pub fn cmd_predict(
    data_path: &Path,
    target: &str,
    features: &[String],
    test_fraction: f64,
    seed: u64,
    trees: usize,
    values: &[String],
) -> anyhow::Result<()> {
    section("Predict");

    let input = parse_values(values)?;
    let mut session = Session::new().with_target(target);

    step_run("Loading data");
    let features = {
        let dataset = session.load_path(data_path)?;
        step_done(&format!("{} rows, {} task", dataset.n_rows(), dataset.task()));
        resolve_features(dataset, features)?
    };

    let config = TrainConfig::new(features)
        .with_test_fraction(test_fraction)
        .with_random_seed(seed)
        .with_n_trees(trees);

    step_run("Training");
    let start = Instant::now();
    session.train(config)?;
    step_done(&format!("{:?}", start.elapsed()));

    let prediction = session.predict(&input)?;

    println!();
    println!(
        "  {:<12} {}",
        muted("Prediction"),
        prediction.to_string().white().bold()
    );
    if let Some(model) = session.model() {
        println!("  {:<12} {}", muted("Features"), model.features().join(", "));
    }
    step_ok("prediction complete");
    println!();
    Ok(())
}

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn resolve_features(dataset: &Dataset, requested: &[String]) -> anyhow::Result<Vec<String>> {
    if !requested.is_empty() {
        return Ok(requested.to_vec());
    }
    let candidates = dataset.feature_candidates();
    if candidates.is_empty() {
        anyhow::bail!("no numeric feature columns besides the target; pass --features");
    }
    Ok(candidates)
}

fn parse_values(pairs: &[String]) -> anyhow::Result<HashMap<String, f64>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected NAME=VALUE, got '{}'", pair))?;
        let parsed: f64 = value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("'{}' is not a numeric value in '{}'", value, pair))?;
        map.insert(name.trim().to_string(), parsed);
    }
    Ok(map)
}

fn print_histogram(hist: &Histogram) {
    let max_count = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    for (i, &count) in hist.counts.iter().enumerate() {
        let bar_width = count * 40 / max_count;
        println!(
            "  {:>9.3} .. {:>9.3}  {} {}",
            hist.edges[i],
            hist.edges[i + 1],
            "█".repeat(bar_width),
            dim(&count.to_string()),
        );
    }
}

fn print_correlation(corr: &CorrelationMatrix) {
    if corr.is_empty() {
        println!("  {}", muted("no numeric columns"));
        return;
    }
    print!("  {:>12}", "");
    for name in &corr.columns {
        print!(" {:>10}", truncate(name, 10));
    }
    println!();
    for (i, name) in corr.columns.iter().enumerate() {
        print!("  {:>12}", truncate(name, 12));
        for value in &corr.values[i] {
            if value.is_nan() {
                print!(" {:>10}", muted("nan"));
            } else {
                print!(" {:>10.3}", value);
            }
        }
        println!();
    }
}
