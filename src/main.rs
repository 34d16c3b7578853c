use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depclump::{Algorithm, Analysis, AnalysisConfig, Metric, Repository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable report
    Text,
    /// The report as JSON
    Json,
}

/// Cluster repositories by their dependencies and benchmark the result against their categories
#[derive(Parser, Debug)]
#[command(name = "depclump")]
#[command(version)]
struct Cli {
    /// JSON array of mined repositories
    input: PathBuf,

    /// TOML configuration file; flags override its values
    #[arg(short, long, env = "DEPCLUMP_CONFIG")]
    config: Option<PathBuf>,

    /// Affinity metric: and, xor, distance
    #[arg(short, long)]
    metric: Option<Metric>,

    /// Clustering algorithm: centroid, hierarchical, density, spectral
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Number of clusters (centroid, hierarchical and spectral)
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// Fraction of repositories held out for the hybrid evaluation; 0 disables it
    #[arg(long)]
    test_split: Option<f64>,

    /// Ignore transitive dependencies when building the vocabulary
    #[arg(long)]
    exclude_transitive: bool,

    /// Drop dependencies declared only once
    #[arg(long)]
    exclude_single_occurrence: bool,

    /// Smallest cluster the density algorithm reports
    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// Distance under which the density algorithm merges clusters
    #[arg(long)]
    cluster_selection_epsilon: Option<f64>,

    /// Seed for the split and randomized algorithms
    #[arg(long)]
    seed: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Verbose logging to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(metric) = self.metric {
            config.metric = metric;
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(k) = self.clusters {
            config.cluster_count = Some(k);
        }
        if let Some(fraction) = self.test_split {
            config.test_split_fraction = fraction;
        }
        if self.exclude_transitive {
            config.include_transitive = false;
        }
        if self.exclude_single_occurrence {
            config.include_single_occurrence = false;
        }
        if let Some(size) = self.min_cluster_size {
            config.min_cluster_size = size;
        }
        if let Some(epsilon) = self.cluster_selection_epsilon {
            config.cluster_selection_epsilon = epsilon;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "depclump=info,warn",
        _ => "depclump=debug,info",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_repositories(path: &Path) -> Result<Vec<Repository>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse repositories from {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config()?;
    let repos = load_repositories(&cli.input)?;
    info!(path = %cli.input.display(), repositories = repos.len(), "read input");

    let report = Analysis::new(config)
        .run(&repos)
        .context("analysis failed")?;

    match cli.format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
