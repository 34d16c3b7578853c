//! Clustering algorithms for grouping repositories.
//!
//! Every algorithm produces a hard assignment: one label per input item, in
//! input order. Labels are `0..n_clusters`; the density algorithm additionally
//! marks outliers with [`NOISE`].
//!
//! ## Algorithms
//!
//! ### Centroid (k-means)
//!
//! Assign each point to the nearest centroid, then move centroids to the mean
//! of their points. Repeat.
//!
//! **Objective**: minimize within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! Works on the raw feature vectors, needs `k`, assumes roughly spherical
//! clusters.
//!
//! ### Hierarchical (average linkage)
//!
//! Repeatedly merges the two most similar groups of the affinity matrix until
//! `k` remain. Good when clusters are nested or uneven in size.
//!
//! ### Density (HDBSCAN)
//!
//! Builds a hierarchy of density levels from a distance matrix and keeps the
//! most stable clusters. Discovers the number of clusters and labels sparse
//! points as noise.
//!
//! ### Spectral
//!
//! Embeds the affinity graph with the leading eigenvectors of its normalized
//! adjacency and runs k-means there. Finds clusters that are connected rather
//! than compact.
//!
//! ## Usage
//!
//! ```rust
//! use depclump::affinity::{AffinityMetric, AndMax};
//! use depclump::cluster::{Agglomerative, Clustering, ClusteringInput, ClusteringStrategy, Kmeans};
//!
//! let data = vec![
//!     vec![1.0, 1.0, 0.0, 0.0],
//!     vec![1.0, 1.0, 1.0, 0.0],
//!     vec![0.0, 0.0, 1.0, 1.0],
//!     vec![0.0, 0.0, 1.0, 1.0],
//! ];
//!
//! let labels = Kmeans::new(2).with_seed(1).fit_predict(&data).unwrap();
//! assert_eq!(labels.len(), data.len());
//!
//! let affinity = AndMax.matrix(&data).unwrap();
//! let input = ClusteringInput::new(&data, &affinity, &AndMax);
//! let labels = Agglomerative::new(2).cluster(&input).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

mod hdbscan;
mod hierarchical;
mod kmeans;
mod spectral;
mod strategy;
mod traits;
pub(crate) mod util;

/// Label assigned to points that belong to no cluster.
pub const NOISE: usize = usize::MAX;

pub use hdbscan::Hdbscan;
pub use hierarchical::{dendrogram, Agglomerative, Merge};
pub use kmeans::{Kmeans, KmeansFit};
pub use spectral::Spectral;
pub use strategy::{build_strategy, Algorithm};
pub use traits::{Clustering, ClusteringInput, ClusteringStrategy};
