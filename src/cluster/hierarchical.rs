//! Agglomerative clustering with average linkage over a similarity matrix.
//!
//! Bottom-up: every point starts as its own cluster and the two most similar
//! clusters merge until `k` remain. The similarity of two clusters is the mean
//! pairwise similarity of their members (UPGMA), maintained with the
//! Lance-Williams update:
//!
//! ```text
//! s(k, i ∪ j) = (|i| s(k, i) + |j| s(k, j)) / (|i| + |j|)
//! ```
//!
//! Merges are found with the nearest-neighbour chain algorithm, which is exact
//! for reducible linkages such as average linkage and needs O(n²) time instead
//! of the O(n³) of a naive closest-pair scan. The chain yields merges out of
//! order, so they are sorted by similarity before cutting the dendrogram.

use super::traits::{ClusteringInput, ClusteringStrategy};
use super::util::{self, UnionFind};
use crate::affinity::AffinityMatrix;
use crate::error::{Error, Result};

/// A single merge: the representatives of the two clusters and their linkage similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub a: usize,
    pub b: usize,
    pub similarity: f64,
}

/// Average-linkage agglomerative clustering on precomputed similarities.
#[derive(Debug, Clone)]
pub struct Agglomerative {
    k: usize,
}

impl Agglomerative {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    /// Cut the average-linkage dendrogram of `similarity` at `k` clusters.
    pub fn fit_predict_precomputed(&self, similarity: &AffinityMatrix) -> Result<Vec<usize>> {
        let n = similarity.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        util::validate_k(self.k, n)?;
        if similarity.values().iter().any(|s| s.is_nan()) {
            return Err(Error::InvalidParameter {
                name: "similarity",
                message: "must not contain NaN",
            });
        }

        let merges = dendrogram(similarity);
        Ok(cut(&merges, n, self.k))
    }
}

impl ClusteringStrategy for Agglomerative {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<Vec<usize>> {
        self.fit_predict_precomputed(input.affinity)
    }
}

/// All `n - 1` merges, most similar first.
pub fn dendrogram(similarity: &AffinityMatrix) -> Vec<Merge> {
    let n = similarity.len();
    if n <= 1 {
        return Vec::new();
    }

    // Working copy; the diagonal is never read. Entries are symmetrized so an
    // asymmetric input cannot make the chain cycle.
    let mut sim = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..n {
            sim[i * n + j] = 0.5 * (similarity.get(i, j) + similarity.get(j, i));
        }
    }

    let mut active = vec![true; n];
    let mut size = vec![1usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n - 1);

    for _ in 0..(n - 1) {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        let (a, b) = loop {
            let a = chain[chain.len() - 1];
            let prev = if chain.len() >= 2 {
                Some(chain[chain.len() - 2])
            } else {
                None
            };

            // Prefer the previous chain element on ties so the chain terminates.
            let mut best = prev;
            let mut best_sim = prev.map_or(f64::NEG_INFINITY, |p| sim[a * n + p]);
            for c in 0..n {
                if c == a || !active[c] {
                    continue;
                }
                let s = sim[a * n + c];
                if s > best_sim || best.is_none() {
                    best_sim = s;
                    best = Some(c);
                }
            }

            match best {
                Some(b) if Some(b) == prev => break (a, b),
                Some(b) => chain.push(b),
                None => unreachable!("at least two active clusters remain"),
            }
        };

        chain.pop();
        chain.pop();

        let (keep, gone) = (a.min(b), a.max(b));
        merges.push(Merge {
            a: keep,
            b: gone,
            similarity: sim[a * n + b],
        });

        let (sa, sb) = (size[a] as f64, size[b] as f64);
        for c in 0..n {
            if !active[c] || c == a || c == b {
                continue;
            }
            let s = (sa * sim[a * n + c] + sb * sim[b * n + c]) / (sa + sb);
            sim[keep * n + c] = s;
            sim[c * n + keep] = s;
        }
        active[gone] = false;
        size[keep] += size[gone];
    }

    merges.sort_by(|x, y| y.similarity.total_cmp(&x.similarity));
    merges
}

/// Apply the first `n - k` merges and label the resulting components `0..k`.
fn cut(merges: &[Merge], n: usize, k: usize) -> Vec<usize> {
    let mut uf = UnionFind::new(n);
    for merge in merges.iter().take(n.saturating_sub(k)) {
        uf.union(merge.a, merge.b);
    }
    let mut labels: Vec<usize> = (0..n).map(|i| uf.find(i)).collect();
    util::compact_labels(&mut labels);
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_matrix() -> AffinityMatrix {
        // {0, 1, 2} and {3, 4} are internally similar; 2 is a bit closer to the second block.
        AffinityMatrix::from_rows(&[
            vec![1.0, 0.9, 0.8, 0.1, 0.0],
            vec![0.9, 1.0, 0.7, 0.0, 0.1],
            vec![0.8, 0.7, 1.0, 0.3, 0.2],
            vec![0.1, 0.0, 0.3, 1.0, 0.95],
            vec![0.0, 0.1, 0.2, 0.95, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn two_blocks() {
        let labels = Agglomerative::new(2)
            .fit_predict_precomputed(&block_matrix())
            .unwrap();
        assert_eq!(labels, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn k_equal_n_keeps_singletons() {
        let labels = Agglomerative::new(5)
            .fit_predict_precomputed(&block_matrix())
            .unwrap();
        assert_eq!(labels, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn k_one_merges_everything() {
        let labels = Agglomerative::new(1)
            .fit_predict_precomputed(&block_matrix())
            .unwrap();
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn merges_follow_average_linkage() {
        let merges = dendrogram(&block_matrix());
        assert_eq!(merges.len(), 4);
        assert_eq!((merges[0].a, merges[0].b), (3, 4));
        assert_eq!((merges[1].a, merges[1].b), (0, 1));
        // {0,1} with 2: mean(0.8, 0.7) = 0.75
        assert!((merges[2].similarity - 0.75).abs() < 1e-12);
        // {0,1,2} with {3,4}: mean of the six cross entries
        let cross = (0.1 + 0.0 + 0.0 + 0.1 + 0.3 + 0.2) / 6.0;
        assert!((merges[3].similarity - cross).abs() < 1e-12);
        assert!(merges.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn invalid_cluster_counts() {
        let m = block_matrix();
        assert!(Agglomerative::new(0).fit_predict_precomputed(&m).is_err());
        assert!(matches!(
            Agglomerative::new(6).fit_predict_precomputed(&m),
            Err(Error::InvalidClusterCount { requested: 6, n_items: 5 })
        ));
    }

    #[test]
    fn single_point() {
        let m = AffinityMatrix::from_rows(&[vec![1.0]]).unwrap();
        assert_eq!(Agglomerative::new(1).fit_predict_precomputed(&m).unwrap(), vec![0]);
    }
}
