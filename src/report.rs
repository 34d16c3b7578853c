//! The outcome of an analysis run and its plain-text rendering.
//!
//! [`AnalysisReport`] implements `Display` for the human-readable report and
//! `Serialize` for machine consumers. Non-finite ratios serialize as `null`.

use std::fmt;

use serde::Serialize;

use crate::affinity::Metric;
use crate::benchmark::{ClusterComposition, ClusteringBenchmark, SimilarityBenchmark};
use crate::cluster::Algorithm;

/// Cluster assignment of one training repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub id: String,
    pub category: String,
    /// Predicted cluster; `None` for noise.
    pub cluster: Option<usize>,
}

/// Result of the held-out evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HybridReport {
    Evaluated {
        test_size: usize,
        centroid_count: usize,
        similarity: SimilarityBenchmark,
    },
    Skipped {
        reason: String,
    },
}

impl HybridReport {
    pub fn similarity(&self) -> Option<&SimilarityBenchmark> {
        match self {
            HybridReport::Evaluated { similarity, .. } => Some(similarity),
            HybridReport::Skipped { .. } => None,
        }
    }
}

/// Everything one run measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub repositories: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub dependency_count: usize,
    pub categories: Vec<String>,
    pub metric: Metric,
    pub algorithm: Algorithm,
    pub similarity: SimilarityBenchmark,
    pub clustering: ClusteringBenchmark,
    pub hybrid: HybridReport,
    pub assignments: Vec<Assignment>,
}

impl AnalysisReport {
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: Option<f64>, missing: &str) -> fmt::Result {
    match value {
        Some(v) if v.is_infinite() && v > 0.0 => writeln!(f, "inf"),
        Some(v) => writeln!(f, "{v}"),
        None => writeln!(f, "{missing}"),
    }
}

impl fmt::Display for SimilarityBenchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== BENCHMARKING SIMILARITY ===")?;
        writeln!(f, "  Inner similarity: {}", self.inner)?;
        write!(f, "  Outer similarity: ")?;
        write_value(f, self.outer, "undefined (no cross-category pairs)")?;
        write!(f, "  Inner/outer ratio: ")?;
        write_value(f, self.ratio, "undefined")
    }
}

impl fmt::Display for ClusterComposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label {
            Some(label) => writeln!(f, "  - Cluster {label}")?,
            None => writeln!(f, "  - Noise")?,
        }
        for c in &self.counts {
            writeln!(f, "    -> {}: {}/{}", c.category, c.count, self.size)?;
        }
        Ok(())
    }
}

impl fmt::Display for ClusteringBenchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== BENCHMARKING CLUSTERING ===")?;
        writeln!(f, "  Rand index: {}", self.rand_index)?;
        writeln!(
            f,
            "  Normalized mutual information: {}",
            self.normalized_mutual_info
        )?;
        writeln!(f, "  Clusters composition")?;
        for row in &self.composition {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

impl fmt::Display for HybridReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== HYBRID EVALUATION ===")?;
        match self {
            HybridReport::Evaluated {
                test_size,
                centroid_count,
                similarity,
            } => {
                writeln!(
                    f,
                    "  {test_size} held-out repos projected onto {centroid_count} centroids"
                )?;
                write!(f, "{similarity}")
            }
            HybridReport::Skipped { reason } => writeln!(f, "  Skipped: {reason}"),
        }
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Loaded {} repos ({} train, {} test)",
            self.repositories, self.train_size, self.test_size
        )?;
        writeln!(f, "Extracted {} dependencies", self.dependency_count)?;
        writeln!(f, "Extracted {} categories", self.category_count())?;
        writeln!(f, "Affinity metric: {}", self.metric)?;
        write!(f, "{}", self.similarity)?;
        writeln!(f, "Clustering algorithm: {}", self.algorithm)?;
        write!(f, "Number of clusters: {}", self.clustering.cluster_count)?;
        if self.clustering.noise_count > 0 {
            write!(f, " ({} noise)", self.clustering.noise_count)?;
        }
        writeln!(f)?;
        write!(f, "{}", self.clustering)?;
        write!(f, "{}", self.hybrid)
    }
}
