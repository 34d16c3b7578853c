//! Selecting a clustering algorithm from configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::hdbscan::Hdbscan;
use super::hierarchical::Agglomerative;
use super::kmeans::Kmeans;
use super::spectral::Spectral;
use super::traits::{Clustering, ClusteringInput, ClusteringStrategy};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// Configured choice of clustering algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum Algorithm {
    /// K-means on the raw vectors.
    Centroid,
    /// Average-linkage agglomerative clustering on the affinity matrix.
    Hierarchical,
    /// HDBSCAN on distances derived from the affinity matrix.
    #[default]
    Density,
    /// Spectral clustering on the affinity matrix.
    Spectral,
}

impl Algorithm {
    pub const EXPECTED: &'static str = "centroid, hierarchical, density, spectral";

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Centroid => "centroid",
            Algorithm::Hierarchical => "hierarchical",
            Algorithm::Density => "density",
            Algorithm::Spectral => "spectral",
        }
    }

    /// Whether this algorithm needs `cluster_count`.
    pub fn requires_cluster_count(self) -> bool {
        !matches!(self, Algorithm::Density)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "centroid" | "kmeans" | "k-means" => Ok(Algorithm::Centroid),
            "hierarchical" | "agglomerative" | "aglo" => Ok(Algorithm::Hierarchical),
            "density" | "hdbscan" | "dbscan" => Ok(Algorithm::Density),
            "spectral" => Ok(Algorithm::Spectral),
            _ => Err(Error::UnknownOption {
                option: "clustering algorithm",
                value: s.to_owned(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Build the strategy named by `config.algorithm`.
pub fn build_strategy(config: &AnalysisConfig) -> Result<Box<dyn ClusteringStrategy>> {
    let algorithm = config.algorithm;
    let k = match (algorithm.requires_cluster_count(), config.cluster_count) {
        (true, None) => {
            return Err(Error::MissingClusterCount {
                algorithm: algorithm.as_str(),
            })
        }
        (_, k) => k.unwrap_or(0),
    };

    let strategy: Box<dyn ClusteringStrategy> = match algorithm {
        Algorithm::Centroid => Box::new(Kmeans::new(k).with_seed_opt(config.seed)),
        Algorithm::Hierarchical => Box::new(Agglomerative::new(k)),
        Algorithm::Density => Box::new(
            Hdbscan::new()
                .with_min_cluster_size(config.min_cluster_size)
                .with_cluster_selection_epsilon(config.cluster_selection_epsilon),
        ),
        Algorithm::Spectral => Box::new(Spectral::new(k).with_seed_opt(config.seed)),
    };
    Ok(strategy)
}

impl ClusteringStrategy for Kmeans {
    fn name(&self) -> &'static str {
        "centroid"
    }

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<Vec<usize>> {
        self.fit_predict(input.vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("kmeans".parse::<Algorithm>().unwrap(), Algorithm::Centroid);
        assert_eq!("aglo".parse::<Algorithm>().unwrap(), Algorithm::Hierarchical);
        assert_eq!("DBSCAN".parse::<Algorithm>().unwrap(), Algorithm::Density);
        assert_eq!("hdbscan".parse::<Algorithm>().unwrap(), Algorithm::Density);
        assert_eq!("spectral".parse::<Algorithm>().unwrap(), Algorithm::Spectral);
        assert_eq!(Algorithm::default(), Algorithm::Density);
    }

    #[test]
    fn unknown_name_is_reported() {
        let err = "optics".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, Error::UnknownOption { ref value, .. } if value == "optics"));
    }

    #[test]
    fn cluster_count_required_where_needed() {
        for algorithm in [Algorithm::Centroid, Algorithm::Hierarchical, Algorithm::Spectral] {
            let config = AnalysisConfig {
                algorithm,
                cluster_count: None,
                ..AnalysisConfig::default()
            };
            assert!(matches!(
                build_strategy(&config),
                Err(Error::MissingClusterCount { .. })
            ));
        }

        let density = AnalysisConfig::default();
        assert_eq!(build_strategy(&density).unwrap().name(), "density");
    }

    #[test]
    fn builds_named_strategies() {
        let names: Vec<&str> = [
            Algorithm::Centroid,
            Algorithm::Hierarchical,
            Algorithm::Density,
            Algorithm::Spectral,
        ]
        .into_iter()
        .map(|algorithm| {
            let config = AnalysisConfig {
                algorithm,
                cluster_count: Some(2),
                ..AnalysisConfig::default()
            };
            build_strategy(&config).unwrap().name()
        })
        .collect();
        assert_eq!(names, ["centroid", "hierarchical", "density", "spectral"]);
    }
}
