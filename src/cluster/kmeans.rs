//! K-means with k-means++ seeding and Lloyd iterations.
//!
//! # Algorithm
//!
//! 1. **Seeding (k-means++, Arthur & Vassilvitskii 2007)**: pick the first
//!    centroid uniformly, then each next one with probability proportional to
//!    the squared distance to the nearest centroid chosen so far.
//! 2. **Lloyd iterations**: assign every point to its nearest centroid, move
//!    each centroid to the mean of its points, repeat until the largest
//!    centroid shift drops below `tol` or `max_iter` is reached. A cluster
//!    left without points is reseeded on the point farthest from its centroid.
//!
//! Random initialization makes the result run-dependent unless a seed is set.

use super::traits::Clustering;
use super::util::{self, rng_from_seed};
use crate::error::Result;
use rand::prelude::*;

/// K-means clustering.
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    max_iter: usize,
    tol: f32,
    seed: Option<u64>,
}

/// Result of fitting k-means.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Final centroids, `k` rows.
    pub centroids: Vec<Vec<f32>>,
    /// Index of the nearest centroid for every input point.
    pub labels: Vec<usize>,
    /// Sum of squared distances of points to their centroid.
    pub inertia: f64,
    /// Lloyd iterations performed.
    pub n_iter: usize,
}

impl Kmeans {
    /// Create a k-means clusterer for `k` clusters.
    ///
    /// Defaults: `max_iter = 300`, `tol = 1e-4`, unseeded.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-4,
            seed: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Seed the initialization for reproducible results.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_opt(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the model and return centroids alongside the labels.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<KmeansFit> {
        let d = util::validate_points(data)?;
        util::validate_k(self.k, data.len())?;

        let mut rng = rng_from_seed(self.seed);
        let mut centroids = kmeans_plus_plus(data, self.k, &mut rng);
        let mut labels = vec![0usize; data.len()];
        let mut n_iter = 0;

        for _ in 0..self.max_iter {
            n_iter += 1;
            assign(data, &centroids, &mut labels);

            let mut sums = vec![vec![0.0f32; d]; self.k];
            let mut counts = vec![0usize; self.k];
            for (point, &label) in data.iter().zip(&labels) {
                counts[label] += 1;
                for (s, x) in sums[label].iter_mut().zip(point) {
                    *s += x;
                }
            }

            let mut max_shift = 0.0f32;
            let mut empty = Vec::new();
            for (c, (sum, &count)) in sums.into_iter().zip(&counts).enumerate() {
                if count == 0 {
                    empty.push(c);
                    continue;
                }
                let mean: Vec<f32> = sum.into_iter().map(|s| s / count as f32).collect();
                max_shift = max_shift.max(util::squared_euclidean(&centroids[c], &mean));
                centroids[c] = mean;
            }
            if !empty.is_empty() {
                max_shift = max_shift.max(reseed_empty(data, &mut centroids, &labels, &empty));
            }

            if max_shift <= self.tol {
                break;
            }
        }

        let inertia = assign(data, &centroids, &mut labels);
        Ok(KmeansFit {
            centroids,
            labels,
            inertia,
            n_iter,
        })
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Assign every point to its nearest centroid; returns the inertia.
fn assign(data: &[Vec<f32>], centroids: &[Vec<f32>], labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0f64;
    for (point, label) in data.iter().zip(labels.iter_mut()) {
        let (best, dist) = nearest(point, centroids);
        *label = best;
        inertia += f64::from(dist);
    }
    inertia
}

fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f32) {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = util::squared_euclidean(point, centroid);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    (best, best_dist)
}

fn kmeans_plus_plus(data: &[Vec<f32>], k: usize, rng: &mut dyn RngCore) -> Vec<Vec<f32>> {
    let n = data.len();
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(data[rng.random_range(0..n)].clone());

    let mut min_d2: Vec<f32> = data
        .iter()
        .map(|p| util::squared_euclidean(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_d2.iter().map(|&x| f64::from(x)).sum();
        let next = if total > 0.0 {
            weighted_pick(&min_d2, rng.random::<f64>() * total)
        } else {
            // Every point coincides with a centroid already; duplicates are unavoidable.
            rng.random_range(0..n)
        };

        let centroid = data[next].clone();
        for (d2, p) in min_d2.iter_mut().zip(data) {
            *d2 = d2.min(util::squared_euclidean(p, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

/// Index selected by walking `weights` until `target` is used up.
///
/// Rounding can leave `target` positive after the last weight; the pick then
/// falls back to the last index with positive weight, never to a point that
/// already coincides with a centroid.
fn weighted_pick(weights: &[f32], mut target: f64) -> usize {
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        last_positive = i;
        target -= f64::from(w);
        if target <= 0.0 {
            return i;
        }
    }
    last_positive
}

/// Move each empty cluster onto the point farthest from its current centroid.
///
/// Returns the largest squared shift among the moved centroids.
fn reseed_empty(
    data: &[Vec<f32>],
    centroids: &mut [Vec<f32>],
    labels: &[usize],
    empty: &[usize],
) -> f32 {
    let mut order: Vec<(usize, f32)> = data
        .iter()
        .zip(labels)
        .map(|(p, &l)| util::squared_euclidean(p, &centroids[l]))
        .enumerate()
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut max_shift = 0.0f32;
    for (&c, &(point, _)) in empty.iter().zip(&order) {
        max_shift = max_shift.max(util::squared_euclidean(&centroids[c], &data[point]));
        centroids[c] = data[point].clone();
    }
    max_shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn blobs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![0.0, 0.2],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
            vec![9.9, 10.0],
        ]
    }

    #[test]
    fn separates_two_blobs() {
        let labels = Kmeans::new(2).with_seed(42).fit_predict(&blobs()).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let data = blobs();
        let a = Kmeans::new(3).with_seed(7).fit(&data).unwrap();
        let b = Kmeans::new(3).with_seed(7).fit(&data).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn fit_reports_centroids_and_inertia() {
        let fit = Kmeans::new(2).with_seed(1).fit(&blobs()).unwrap();
        assert_eq!(fit.centroids.len(), 2);
        assert!(fit.inertia >= 0.0);
        assert!(fit.inertia < 1.0);
        assert!(fit.n_iter >= 1);
    }

    #[test]
    fn identical_points_do_not_break_seeding() {
        let data = vec![vec![1.0, 0.0]; 5];
        let labels = Kmeans::new(3).with_seed(3).fit_predict(&data).unwrap();
        assert_eq!(labels.len(), 5);
        assert!(labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn invalid_k() {
        let data = blobs();
        assert!(matches!(
            Kmeans::new(0).fit_predict(&data),
            Err(Error::InvalidParameter { name: "k", .. })
        ));
        assert!(matches!(
            Kmeans::new(7).fit_predict(&data),
            Err(Error::InvalidClusterCount { requested: 7, n_items: 6 })
        ));
    }

    #[test]
    fn empty_input() {
        let data: Vec<Vec<f32>> = vec![];
        assert!(Kmeans::new(1).fit_predict(&data).is_err());
    }

    #[test]
    fn weighted_pick_skips_zero_weights() {
        let weights = [0.0, 2.0, 0.0, 3.0, 0.0];
        assert_eq!(weighted_pick(&weights, 1.0), 1);
        assert_eq!(weighted_pick(&weights, 2.5), 3);
        // Leftover target after rounding lands on the last positive weight.
        assert_eq!(weighted_pick(&weights, 5.0 + 1e-9), 3);
    }

    #[test]
    fn empty_cluster_moves_to_farthest_point() {
        let data = vec![vec![0.0], vec![1.0], vec![10.0]];
        let mut centroids = vec![vec![0.5], vec![5.0], vec![100.0]];
        let shift = reseed_empty(&data, &mut centroids, &[0, 0, 1], &[2]);
        assert_eq!(centroids[2], vec![10.0]);
        assert_eq!(centroids[0], vec![0.5]);
        assert!((shift - 8100.0).abs() < 1e-3);
    }
}
