//! Analysis configuration.
//!
//! Every option has a default, so an empty TOML file is a valid
//! configuration. Keys use snake_case; the camelCase spellings of the
//! original option names are accepted as aliases.
//!
//! ```toml
//! algorithm = "hierarchical"
//! metric = "xor"
//! cluster_count = 3
//! test_split_fraction = 0.2
//! include_transitive = false
//! seed = 42
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::affinity::Metric;
use crate::catalog::CatalogPolicy;
use crate::cluster::Algorithm;
use crate::error::{Error, Result};

/// Options controlling one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Count transitive declarations toward the dependency vocabulary.
    #[serde(alias = "includeTransitive")]
    pub include_transitive: bool,
    /// Keep dependencies declared only once across the training set.
    #[serde(alias = "includeSingleOccurrence")]
    pub include_single_occurrence: bool,
    #[serde(alias = "clusteringAlgorithm")]
    pub algorithm: Algorithm,
    #[serde(alias = "affinityMetric")]
    pub metric: Metric,
    /// Target number of clusters; required by every algorithm except density.
    #[serde(alias = "clusterCount", skip_serializing_if = "Option::is_none")]
    pub cluster_count: Option<usize>,
    /// Share of repositories held out for the hybrid evaluation, in `[0, 1)`.
    #[serde(alias = "testSplitFraction")]
    pub test_split_fraction: f64,
    /// Smallest group the density algorithm reports as a cluster.
    pub min_cluster_size: usize,
    /// Distance below which the density algorithm merges sibling clusters.
    pub cluster_selection_epsilon: f64,
    /// Seed for the split and every randomized algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include_transitive: true,
            include_single_occurrence: true,
            algorithm: Algorithm::default(),
            metric: Metric::default(),
            cluster_count: None,
            test_split_fraction: 0.2,
            min_cluster_size: 5,
            cluster_selection_epsilon: 0.5,
            seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Vocabulary inclusion policy derived from this configuration.
    pub fn catalog_policy(&self) -> CatalogPolicy {
        CatalogPolicy {
            include_transitive: self.include_transitive,
            include_single_occurrence: self.include_single_occurrence,
        }
    }

    /// Reject option combinations that would fail later in the run.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.test_split_fraction) {
            return Err(Error::InvalidParameter {
                name: "test_split_fraction",
                message: "must be in [0, 1)",
            });
        }
        match self.cluster_count {
            Some(0) => {
                return Err(Error::InvalidParameter {
                    name: "cluster_count",
                    message: "must be at least 1",
                })
            }
            None if self.algorithm.requires_cluster_count() => {
                return Err(Error::MissingClusterCount {
                    algorithm: self.algorithm.as_str(),
                })
            }
            _ => {}
        }
        if self.min_cluster_size < 2 {
            return Err(Error::InvalidParameter {
                name: "min_cluster_size",
                message: "must be at least 2",
            });
        }
        if !(self.cluster_selection_epsilon >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "cluster_selection_epsilon",
                message: "must be non-negative",
            });
        }
        Ok(())
    }
}
