//! Dependency-based repository clustering.
//!
//! `depclump` asks how well a repository's declared dependencies predict its
//! category. It turns each repository into a binary vector over a shared
//! dependency vocabulary, measures pairwise similarity, clusters the corpus and
//! scores both the similarity measure and the clustering against the known
//! categories. A held-out split is re-scored in distance-to-centroid space.
//!
//! - [`repo`]: input records.
//! - [`catalog`]: dependency and category vocabularies.
//! - [`vectorize`]: binary feature vectors.
//! - [`affinity`]: AND, XOR and DISTANCE similarity matrices.
//! - [`cluster`]: centroid, hierarchical, density and spectral clustering.
//! - [`benchmark`]: inner/outer similarity ratio, rand index, NMI, composition.
//! - [`hybrid`]: distance-to-centroid projection.
//! - [`pipeline`]: runs everything from an [`AnalysisConfig`].
//!
//! ```rust
//! use depclump::{Analysis, AnalysisConfig, Repository};
//!
//! let mut repos = Vec::new();
//! for i in 0..4 {
//!     repos.push(Repository::with_direct(format!("m{i}"), "mod", &["net.fabricmc:fabric-loader"]));
//!     repos.push(Repository::with_direct(format!("p{i}"), "plugin", &["org.bukkit:bukkit"]));
//! }
//!
//! let config = AnalysisConfig {
//!     cluster_count: Some(2),
//!     algorithm: "kmeans".parse().unwrap(),
//!     test_split_fraction: 0.0,
//!     seed: Some(1),
//!     ..AnalysisConfig::default()
//! };
//! let report = Analysis::new(config).run(&repos).unwrap();
//! assert_eq!(report.clustering.cluster_count, 2);
//! assert_eq!(report.similarity.ratio, Some(f64::INFINITY));
//! ```

#![forbid(unsafe_code)]

pub mod affinity;
pub mod benchmark;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod error;
pub mod hybrid;
pub mod pipeline;
pub mod report;
pub mod repo;
pub mod split;
pub mod vectorize;

pub use affinity::{AffinityMatrix, AffinityMetric, AndMax, Metric, NegativeDistance, Xor};
pub use benchmark::{ClusterComposition, ClusteringBenchmark, SimilarityBenchmark};
pub use catalog::{CatalogPolicy, CategoryVocabulary, DependencyVocabulary};
pub use cluster::{
    Agglomerative, Algorithm, Clustering, ClusteringInput, ClusteringStrategy, Hdbscan, Kmeans,
    KmeansFit, Spectral, NOISE,
};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use hybrid::Centroids;
pub use pipeline::Analysis;
pub use report::{AnalysisReport, HybridReport};
pub use repo::{Dependency, DependencyKind, Repository};
pub use split::{train_test_split, Split};
pub use vectorize::{vectorize, FeatureVectors};
