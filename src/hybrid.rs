//! Distance-to-centroid projection for held-out repositories.
//!
//! A training clustering yields one centroid per populated cluster. Every
//! held-out vector is then re-expressed as its Euclidean distances to those
//! centroids, a low-dimensional "distance to archetype" space whose
//! separability can be scored like any other feature space.

use std::collections::BTreeMap;

use tracing::warn;

use crate::affinity::euclidean;
use crate::cluster::NOISE;
use crate::error::{Error, Result};

/// Cluster centroids computed from a labeled training set.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroids {
    labels: Vec<usize>,
    vectors: Vec<Vec<f32>>,
}

impl Centroids {
    /// Element-wise mean of the vectors assigned to each non-noise label.
    ///
    /// `labels` must align with `vectors`. Noise points never contribute, and a
    /// label with no members yields no centroid.
    pub fn from_assignments(vectors: &[Vec<f32>], labels: &[usize]) -> Result<Self> {
        if vectors.len() != labels.len() {
            return Err(Error::LengthMismatch {
                expected: vectors.len(),
                found: labels.len(),
            });
        }
        let dim = vectors.first().map_or(0, Vec::len);

        let mut sums: BTreeMap<usize, (Vec<f64>, usize)> = BTreeMap::new();
        for (vector, &label) in vectors.iter().zip(labels) {
            if label == NOISE {
                continue;
            }
            if vector.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: vector.len(),
                });
            }
            let (sum, count) = sums.entry(label).or_insert_with(|| (vec![0.0; dim], 0));
            for (s, &x) in sum.iter_mut().zip(vector) {
                *s += f64::from(x);
            }
            *count += 1;
        }

        // Labels are expected to be dense; a gap means a cluster lost all its members.
        if let Some(&max) = sums.keys().next_back() {
            let missing = (0..=max).filter(|l| !sums.contains_key(l)).count();
            if missing > 0 {
                warn!(missing, "skipping centroids of clusters without members");
            }
        }

        if sums.is_empty() {
            return Err(Error::NoCentroids);
        }

        let mut out_labels = Vec::with_capacity(sums.len());
        let mut out_vectors = Vec::with_capacity(sums.len());
        for (label, (sum, count)) in sums {
            out_labels.push(label);
            out_vectors.push(sum.into_iter().map(|s| (s / count as f64) as f32).collect());
        }
        Ok(Self {
            labels: out_labels,
            vectors: out_vectors,
        })
    }

    /// Cluster label of each centroid, ascending.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Distance of `vector` to every centroid, in centroid order.
    pub fn distances(&self, vector: &[f32]) -> Result<Vec<f32>> {
        let dim = self.vectors.first().map_or(0, Vec::len);
        if vector.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: vector.len(),
            });
        }
        Ok(self
            .vectors
            .iter()
            .map(|c| euclidean(vector, c) as f32)
            .collect())
    }

    /// Project every vector into distance-to-centroid space.
    pub fn project(&self, vectors: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        vectors.iter().map(|v| self.distances(v)).collect()
    }
}
