//! Spectral clustering on a precomputed affinity matrix.
//!
//! # Algorithm (Shi & Malik 2000; Ng, Jordan & Weiss 2002)
//!
//! 1. Treat the affinity matrix `W` as a weighted graph (diagonal ignored) and
//!    form the normalized adjacency `M = D^-1/2 W D^-1/2`, where `D` holds the
//!    node degrees. Isolated nodes keep a unit degree.
//! 2. The `k` eigenvectors of `M` with the largest eigenvalues (equivalently the
//!    smallest of the normalized Laplacian `I - M`) span the spectral embedding.
//!    They are found by orthogonal subspace iteration on `M + I`, which shifts the
//!    spectrum into `[0, 2]` so the wanted eigenvalues are also the largest in
//!    magnitude.
//! 3. Rows of the eigenvector block, rescaled by `D^-1/2`, are clustered with k-means.
//!
//! K-means is invariant to rotations of the embedding, so any orthonormal basis
//! of the dominant subspace gives the same partition; the iteration only has to
//! converge as a subspace.
//!
//! This is a small dense implementation, O(n² k) per iteration. It needs
//! non-negative affinities: use AND or XOR, not the signed distance metric.

use super::kmeans::Kmeans;
use super::traits::{Clustering, ClusteringInput, ClusteringStrategy};
use super::util::{self, rng_from_seed};
use crate::affinity::AffinityMatrix;
use crate::error::{Error, Result};
use rand::prelude::*;
use tracing::debug;

/// Spectral clustering.
#[derive(Debug, Clone)]
pub struct Spectral {
    k: usize,
    max_iter: usize,
    tol: f64,
    seed: Option<u64>,
}

impl Spectral {
    /// Defaults: `max_iter = 300`, `tol = 1e-10`, unseeded.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-10,
            seed: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_opt(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Cluster the graph described by `affinity` into `k` groups.
    pub fn fit_predict_precomputed(&self, affinity: &AffinityMatrix) -> Result<Vec<usize>> {
        let n = affinity.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        util::validate_k(self.k, n)?;
        if affinity.values().iter().any(|w| w.is_nan() || *w < 0.0) {
            return Err(Error::InvalidParameter {
                name: "affinity",
                message: "spectral clustering requires non-negative affinities",
            });
        }
        if self.k == 1 {
            return Ok(vec![0; n]);
        }

        let embedding = self.embed(affinity);
        Kmeans::new(self.k)
            .with_seed_opt(self.seed)
            .fit_predict(&embedding)
    }

    /// Spectral embedding: one `k`-dimensional row per node.
    pub fn embed(&self, affinity: &AffinityMatrix) -> Vec<Vec<f32>> {
        let n = affinity.len();
        let k = self.k.min(n);

        let mut weights = vec![0.0f64; n * n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    weights[i * n + j] = 0.5 * (affinity.get(i, j) + affinity.get(j, i));
                }
            }
        }

        let inv_sqrt_degree: Vec<f64> = (0..n)
            .map(|i| {
                let degree: f64 = weights[i * n..(i + 1) * n].iter().sum();
                if degree > 0.0 {
                    1.0 / degree.sqrt()
                } else {
                    1.0
                }
            })
            .collect();

        for i in 0..n {
            for j in 0..n {
                weights[i * n + j] *= inv_sqrt_degree[i] * inv_sqrt_degree[j];
            }
        }

        let basis = self.dominant_subspace(&weights, n, k);

        (0..n)
            .map(|i| {
                (0..k)
                    .map(|c| (basis[c * n + i] * inv_sqrt_degree[i]) as f32)
                    .collect()
            })
            .collect()
    }

    /// Orthonormal basis (column-major, `k` columns of length `n`) of the dominant
    /// `k`-dimensional invariant subspace of `m + I`.
    fn dominant_subspace(&self, m: &[f64], n: usize, k: usize) -> Vec<f64> {
        let mut rng = rng_from_seed(self.seed);
        let mut q: Vec<f64> = (0..n * k).map(|_| rng.random::<f64>() * 2.0 - 1.0).collect();
        orthonormalize(&mut q, n, k);

        let mut z = vec![0.0f64; n * k];
        for iter in 0..self.max_iter {
            for c in 0..k {
                let col = &q[c * n..(c + 1) * n];
                for i in 0..n {
                    let row = &m[i * n..(i + 1) * n];
                    let dot: f64 = row.iter().zip(col).map(|(a, b)| a * b).sum();
                    z[c * n + i] = col[i] + dot;
                }
            }
            orthonormalize(&mut z, n, k);

            // Subspace distance: k - ||Q^T Z||_F^2, zero when the spans agree.
            let mut overlap = 0.0f64;
            for a in 0..k {
                for b in 0..k {
                    let d: f64 = q[a * n..(a + 1) * n]
                        .iter()
                        .zip(&z[b * n..(b + 1) * n])
                        .map(|(x, y)| x * y)
                        .sum();
                    overlap += d * d;
                }
            }
            std::mem::swap(&mut q, &mut z);

            let delta = (k as f64 - overlap).abs();
            if delta < self.tol {
                debug!(iterations = iter + 1, delta, "spectral subspace converged");
                break;
            }
        }
        q
    }
}

impl ClusteringStrategy for Spectral {
    fn name(&self) -> &'static str {
        "spectral"
    }

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<Vec<usize>> {
        self.fit_predict_precomputed(&input.kernel())
    }
}

/// Modified Gram-Schmidt over the `k` columns of a column-major `n x k` block.
///
/// A column that collapses onto the previous ones is replaced by the first
/// standard basis vector that is not already in their span.
fn orthonormalize(cols: &mut [f64], n: usize, k: usize) {
    for c in 0..k {
        project_out(cols, n, c);
        if normalize(&mut cols[c * n..(c + 1) * n]) {
            continue;
        }
        for e in 0..n {
            cols[c * n..(c + 1) * n].fill(0.0);
            cols[c * n + e] = 1.0;
            project_out(cols, n, c);
            if normalize(&mut cols[c * n..(c + 1) * n]) {
                break;
            }
        }
    }
}

fn project_out(cols: &mut [f64], n: usize, c: usize) {
    for p in 0..c {
        let (done, rest) = cols.split_at_mut(c * n);
        let prev = &done[p * n..(p + 1) * n];
        let cur = &mut rest[..n];
        let d: f64 = prev.iter().zip(cur.iter()).map(|(a, b)| a * b).sum();
        for (x, y) in cur.iter_mut().zip(prev) {
            *x -= d * y;
        }
    }
}

fn normalize(v: &mut [f64]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm <= 1e-12 {
        return false;
    }
    for x in v {
        *x /= norm;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(sizes: &[usize], inner: f64, outer: f64) -> AffinityMatrix {
        let n: usize = sizes.iter().sum();
        let mut group = Vec::with_capacity(n);
        for (g, &s) in sizes.iter().enumerate() {
            group.extend(std::iter::repeat(g).take(s));
        }
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if group[i] == group[j] { inner } else { outer })
                    .collect()
            })
            .collect();
        AffinityMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn separates_disconnected_blocks() {
        let m = blocks(&[4, 3, 5], 1.0, 0.0);
        let labels = Spectral::new(3)
            .with_seed(11)
            .fit_predict_precomputed(&m)
            .unwrap();
        assert!(labels[..4].iter().all(|&l| l == labels[0]));
        assert!(labels[4..7].iter().all(|&l| l == labels[4]));
        assert!(labels[7..].iter().all(|&l| l == labels[7]));
        assert_ne!(labels[0], labels[4]);
        assert_ne!(labels[0], labels[7]);
        assert_ne!(labels[4], labels[7]);
    }

    #[test]
    fn separates_weakly_connected_blocks() {
        let m = blocks(&[6, 6], 0.9, 0.05);
        let labels = Spectral::new(2)
            .with_seed(5)
            .fit_predict_precomputed(&m)
            .unwrap();
        assert!(labels[..6].iter().all(|&l| l == labels[0]));
        assert!(labels[6..].iter().all(|&l| l == labels[6]));
        assert_ne!(labels[0], labels[6]);
    }

    #[test]
    fn embedding_has_k_columns() {
        let m = blocks(&[3, 3], 1.0, 0.1);
        let embedding = Spectral::new(2).with_seed(1).embed(&m);
        assert_eq!(embedding.len(), 6);
        assert!(embedding.iter().all(|row| row.len() == 2));
        assert!(embedding.iter().flatten().all(|x| x.is_finite()));
    }

    #[test]
    fn rejects_negative_affinities() {
        let m = AffinityMatrix::from_rows(&[vec![0.0, -1.0], vec![-1.0, 0.0]]).unwrap();
        assert!(matches!(
            Spectral::new(2).fit_predict_precomputed(&m),
            Err(Error::InvalidParameter { name: "affinity", .. })
        ));
    }

    #[test]
    fn single_cluster_shortcut() {
        let m = blocks(&[3], 1.0, 0.0);
        assert_eq!(Spectral::new(1).fit_predict_precomputed(&m).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn gram_schmidt_yields_orthonormal_columns() {
        let n = 4;
        let mut cols = vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
        orthonormalize(&mut cols, n, 3);
        for a in 0..3 {
            for b in 0..3 {
                let d: f64 = (0..n).map(|i| cols[a * n + i] * cols[b * n + i]).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((d - expected).abs() < 1e-9, "columns {a},{b}: {d}");
            }
        }
    }
}
