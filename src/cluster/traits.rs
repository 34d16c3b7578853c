use crate::affinity::{AffinityMatrix, AffinityMetric};
use crate::error::Result;

/// Common interface for hard clustering algorithms on raw vectors (one label per point).
pub trait Clustering {
    /// Fit the model (if needed) and return one cluster label per input point.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>>;

    /// The configured number of clusters (if applicable).
    ///
    /// For algorithms that discover the number of clusters dynamically (e.g. HDBSCAN),
    /// this returns 0.
    fn n_clusters(&self) -> usize;
}

/// Everything a clustering strategy may draw from.
///
/// Strategies working on raw vectors read `vectors`; strategies working on a
/// precomputed matrix read `affinity` (and use `metric` to turn it into
/// distances when they need them).
#[derive(Clone, Copy)]
pub struct ClusteringInput<'a> {
    pub vectors: &'a [Vec<f32>],
    pub affinity: &'a AffinityMatrix,
    pub metric: &'a dyn AffinityMetric,
}

impl<'a> ClusteringInput<'a> {
    pub fn new(
        vectors: &'a [Vec<f32>],
        affinity: &'a AffinityMatrix,
        metric: &'a dyn AffinityMetric,
    ) -> Self {
        Self {
            vectors,
            affinity,
            metric,
        }
    }

    /// Distance view of the affinity matrix.
    pub fn distances(&self) -> AffinityMatrix {
        self.affinity.to_distances(self.metric)
    }

    /// Non-negative kernel view of the affinity matrix.
    pub fn kernel(&self) -> AffinityMatrix {
        self.affinity.to_kernel(self.metric)
    }
}

/// A clustering algorithm selected by configuration.
pub trait ClusteringStrategy {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// One label per input point, in input order. Noise is [`super::NOISE`].
    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<Vec<usize>>;
}
