//! HDBSCAN: Hierarchical Density-Based Spatial Clustering of Applications with Noise.
//!
//! HDBSCAN (Campello, Moulavi, Sander 2013) extends DBSCAN by removing the global
//! epsilon parameter and instead building a hierarchy of density-based clusters.
//! It selects the most stable clusters from the hierarchy automatically.
//!
//! # Algorithm Outline
//!
//! 1. **Core distance**: For each point, compute the distance to its k-th nearest
//!    neighbor (where k = `min_samples`). This estimates local density.
//!    Distances come either from raw vectors (Euclidean) or from a precomputed
//!    distance matrix, e.g. `1 - similarity` over an affinity matrix.
//!
//! 2. **Mutual reachability distance**: For each pair (i, j):
//!    `mrd(i, j) = max(core_dist[i], core_dist[j], dist(i, j))`.
//!    This smooths out density spikes so sparse regions don't create spurious links.
//!
//! 3. **MST on mutual reachability graph**: Build a minimum spanning tree over the
//!    mutual reachability distances using Prim's algorithm (O(n^2)).
//!
//! 4. **Condensed cluster tree**: Walk MST edges in ascending distance order, merging
//!    components. When a merge produces a component below `min_cluster_size`, those
//!    points "fall out" as noise rather than forming a cluster split.
//!
//! 5. **Stability-based cluster extraction**: Each cluster in the condensed tree has a
//!    stability score = sum over member points of (lambda_p - lambda_birth).
//!    Select the set of non-overlapping clusters that maximizes total stability.
//!
//! 6. **Epsilon merge** (optional): selected clusters born below
//!    `cluster_selection_epsilon` are replaced by the nearest ancestor born above it,
//!    so micro-clusters of near-duplicates do not fragment the result.
//!
//! 7. **Noise labeling**: Points not in any selected cluster are labeled as noise.
//!
//! # When to Use
//!
//! - **HDBSCAN vs DBSCAN**: HDBSCAN handles varying-density clusters without requiring
//!   a global epsilon. Prefer HDBSCAN when cluster densities differ significantly.
//! - **HDBSCAN vs k-means**: HDBSCAN finds non-convex clusters and identifies noise.
//!   Prefer k-means when clusters are roughly spherical and you know k.
//! - **Complexity**: O(n^2) time and space for the dense pairwise distance computation.
//!   Suitable for datasets up to ~10k-50k points depending on dimensionality.
//!
//! # References
//!
//! Campello, R. J. G. B., Moulavi, D., Sander, J. (2013). "Density-Based Clustering
//! Based on Hierarchical Density Estimates." PAKDD 2013.

use super::traits::{Clustering, ClusteringInput, ClusteringStrategy};
use super::util::{self, UnionFind};
use super::NOISE;
use crate::affinity::{euclidean, AffinityMatrix};
use crate::error::{Error, Result};

/// Smallest distance used when converting to lambda = 1 / distance.
///
/// Duplicate points sit at distance 0; capping keeps lambdas and stabilities finite.
const MIN_DISTANCE: f64 = 1e-12;

/// HDBSCAN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_samples: Option<usize>,
    min_cluster_size: usize,
    cluster_selection_epsilon: f64,
}

impl Hdbscan {
    /// Create a new HDBSCAN clusterer with default parameters.
    ///
    /// Defaults: `min_cluster_size = 5`, `min_samples = min_cluster_size`,
    /// `cluster_selection_epsilon = 0.0` (no epsilon merge).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `min_samples` (k for core distance computation).
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = Some(min_samples);
        self
    }

    /// Set `min_cluster_size` (minimum points for a cluster to persist).
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    /// Merge selected clusters born at a distance below `epsilon` into their ancestors.
    pub fn with_cluster_selection_epsilon(mut self, epsilon: f64) -> Self {
        self.cluster_selection_epsilon = epsilon;
        self
    }

    fn min_samples(&self) -> usize {
        self.min_samples.unwrap_or(self.min_cluster_size)
    }

    /// Cluster from a precomputed, symmetric distance matrix.
    pub fn fit_predict_precomputed(&self, distances: &AffinityMatrix) -> Result<Vec<usize>> {
        let n = distances.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        self.validate()?;
        if distances.values().iter().any(|d| d.is_nan() || *d < 0.0) {
            return Err(Error::InvalidParameter {
                name: "distances",
                message: "must be non-negative numbers",
            });
        }

        let core_dists = core_distances(distances, self.min_samples());

        let mut mst = util::prim_mst(n, |i, j| {
            mutual_reachability(distances.get(i, j), core_dists[i], core_dists[j])
        });
        mst.sort_by(|a, b| a.2.total_cmp(&b.2));

        Ok(extract_clusters(
            &mst,
            n,
            self.min_cluster_size,
            self.cluster_selection_epsilon,
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.min_samples() == 0 {
            return Err(Error::InvalidParameter {
                name: "min_samples",
                message: "must be at least 1",
            });
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

impl Default for Hdbscan {
    fn default() -> Self {
        Self {
            min_samples: None,
            min_cluster_size: 5,
            cluster_selection_epsilon: 0.0,
        }
    }
}

impl Clustering for Hdbscan {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        util::validate_points(data)?;
        self.validate()?;
        self.fit_predict_precomputed(&pairwise_distances(data)?)
    }

    fn n_clusters(&self) -> usize {
        0
    }
}

impl ClusteringStrategy for Hdbscan {
    fn name(&self) -> &'static str {
        "density"
    }

    fn cluster(&self, input: &ClusteringInput<'_>) -> Result<Vec<usize>> {
        self.fit_predict_precomputed(&input.distances())
    }
}

fn pairwise_distances(data: &[Vec<f32>]) -> Result<AffinityMatrix> {
    let n = data.len();
    let mut dists = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(&data[i], &data[j]);
            dists[i * n + j] = d;
            dists[j * n + i] = d;
        }
    }
    AffinityMatrix::from_vec(n, dists)
}

fn core_distances(dists: &AffinityMatrix, min_samples: usize) -> Vec<f64> {
    let n = dists.len();
    if n == 1 {
        return vec![0.0];
    }
    let k = min_samples.min(n - 1).max(1);
    let mut core = Vec::with_capacity(n);
    for i in 0..n {
        let mut row: Vec<f64> = dists
            .row(i)
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &d)| d)
            .collect();
        row.sort_by(|a, b| a.total_cmp(b));
        core.push(row[k - 1]);
    }
    core
}

#[inline]
fn mutual_reachability(dist: f64, core_i: f64, core_j: f64) -> f64 {
    dist.max(core_i).max(core_j)
}

// ---------------------------------------------------------------------------
// Condensed cluster tree
// ---------------------------------------------------------------------------

/// An entry in the condensed cluster tree stored as a flat table.
///
/// Each row represents either:
/// - A point falling out of a cluster (child is a point index, child_size = 1)
/// - A cluster splitting into a child cluster (child is a cluster id, child_size > 1)
struct CondensedEdge {
    parent: usize,   // cluster id
    child: usize,    // point index or cluster id
    lambda: f64,     // 1/distance at which this happened
    child_size: usize,
}

fn extract_clusters(
    mst: &[(usize, usize, f64)],
    n: usize,
    min_cluster_size: usize,
    cluster_selection_epsilon: f64,
) -> Vec<usize> {
    if n == 1 {
        return vec![NOISE];
    }

    // Cluster ids start at n (point ids are 0..n-1).
    let mut next_cluster_id = n;
    let mut uf = UnionFind::new(n);
    // UF root -> current cluster id (None if no cluster formed yet).
    let mut comp_cluster: Vec<Option<usize>> = vec![None; n];
    let mut condensed: Vec<CondensedEdge> = Vec::new();

    for &(u, v, dist) in mst {
        let ru = uf.find(u);
        let rv = uf.find(v);
        if ru == rv {
            continue;
        }

        let lambda = 1.0 / dist.max(MIN_DISTANCE);
        let ru_size = uf.size[ru];
        let rv_size = uf.size[rv];

        let left_big = ru_size >= min_cluster_size;
        let right_big = rv_size >= min_cluster_size;

        if left_big && right_big {
            // Genuine split: both sides are large. Children get their ids first so
            // that every parent id is larger than its children's.
            let left_child = comp_cluster[ru].unwrap_or_else(|| {
                let id = next_cluster_id;
                next_cluster_id += 1;
                id
            });
            let right_child = comp_cluster[rv].unwrap_or_else(|| {
                let id = next_cluster_id;
                next_cluster_id += 1;
                id
            });
            let new_cluster = next_cluster_id;
            next_cluster_id += 1;

            condensed.push(CondensedEdge {
                parent: new_cluster,
                child: left_child,
                lambda,
                child_size: ru_size,
            });
            condensed.push(CondensedEdge {
                parent: new_cluster,
                child: right_child,
                lambda,
                child_size: rv_size,
            });

            // Also record individual point fallouts for the children if they
            // had no prior cluster (all their points are "born" into the child).
            if comp_cluster[ru].is_none() {
                add_point_fallouts(&mut condensed, &uf, ru, left_child, lambda, n);
            }
            if comp_cluster[rv].is_none() {
                add_point_fallouts(&mut condensed, &uf, rv, right_child, lambda, n);
            }

            let new_root = uf.union_roots(ru, rv);
            comp_cluster[new_root] = Some(new_cluster);
        } else if left_big || right_big {
            let (big, small) = if left_big { (ru, rv) } else { (rv, ru) };

            // Ensure big side has a cluster.
            let cluster = comp_cluster[big].unwrap_or_else(|| {
                let id = next_cluster_id;
                next_cluster_id += 1;
                // Record all existing big-component points as born into this cluster.
                add_point_fallouts(&mut condensed, &uf, big, id, lambda, n);
                id
            });

            // Small side's points fall out.
            add_point_fallouts(&mut condensed, &uf, small, cluster, lambda, n);

            let new_root = uf.union_roots(big, small);
            comp_cluster[new_root] = Some(cluster);
        } else {
            // Neither is large. Just merge; no cluster event.
            let existing = comp_cluster[ru].or(comp_cluster[rv]);
            let new_root = uf.union_roots(ru, rv);
            comp_cluster[new_root] = existing;
        }
    }

    let num_clusters = next_cluster_id - n;
    if num_clusters == 0 {
        return vec![NOISE; n];
    }

    // Compute lambda_birth for each cluster.
    // A cluster is "born" when it first appears as a child in the condensed tree.
    // The root cluster (never appears as a child) is born at lambda=0.
    let mut lambda_birth = vec![0.0f64; num_clusters];

    for edge in &condensed {
        if edge.child_size > 1 && edge.child >= n {
            let child_idx = edge.child - n;
            lambda_birth[child_idx] = edge.lambda;
        }
    }

    // Compute stability for each cluster.
    // stability(c) = sum over points p that fell out of c: (lambda_p - lambda_birth(c))
    //              + sum over child clusters of c: child_size * (lambda_split - lambda_birth(c))
    //
    // But a simpler formulation: for each condensed edge with parent=c,
    // contribution = child_size * (lambda - lambda_birth(c))
    let mut stability = vec![0.0f64; num_clusters];
    for edge in &condensed {
        if edge.parent < n {
            continue;
        }
        let cluster_idx = edge.parent - n;
        let birth = lambda_birth[cluster_idx];
        stability[cluster_idx] += edge.child_size as f64 * (edge.lambda - birth);
    }

    // Identify which clusters are leaves (no cluster children).
    let mut has_cluster_child = vec![false; num_clusters];
    for edge in &condensed {
        if edge.parent < n {
            continue;
        }
        if edge.child_size > 1 && edge.child >= n {
            let parent_idx = edge.parent - n;
            has_cluster_child[parent_idx] = true;
        }
    }

    // Build children map: parent cluster -> list of child clusters.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); num_clusters];
    for edge in &condensed {
        if edge.parent < n || edge.child < n {
            continue;
        }
        if edge.child_size > 1 {
            let parent_idx = edge.parent - n;
            let child_idx = edge.child - n;
            children[parent_idx].push(child_idx);
        }
    }

    // Select clusters: bottom-up stability selection.
    let mut selected = vec![false; num_clusters];
    let mut subtree_stab = stability.clone();

    // Process bottom-up: parents always have higher ids than their children.
    for i in 0..num_clusters {
        if !has_cluster_child[i] {
            // Leaf cluster: select it.
            selected[i] = true;
        } else {
            let child_sum: f64 = children[i].iter().map(|&c| subtree_stab[c]).sum();
            if stability[i] > child_sum {
                selected[i] = true;
                deselect_descendants(&children, i, &mut selected);
                subtree_stab[i] = stability[i];
            } else {
                subtree_stab[i] = child_sum;
            }
        }
    }

    if cluster_selection_epsilon > 0.0 {
        let mut parent_of: Vec<Option<usize>> = vec![None; num_clusters];
        for (parent, kids) in children.iter().enumerate() {
            for &child in kids {
                parent_of[child] = Some(parent);
            }
        }
        apply_selection_epsilon(
            &mut selected,
            &children,
            &parent_of,
            &lambda_birth,
            cluster_selection_epsilon,
        );
    }

    // Assign labels by walking selected clusters and labeling all their points
    // (direct fallouts + non-selected descendant subtrees).
    let mut labels = vec![NOISE; n];
    let mut label_map = vec![usize::MAX; num_clusters];
    let mut next_label = 0usize;
    for (i, &sel) in selected.iter().enumerate() {
        if sel {
            label_map[i] = next_label;
            next_label += 1;
        }
    }

    // For each selected cluster, label all its points (direct + descendants).
    for i in 0..num_clusters {
        if !selected[i] {
            continue;
        }
        let label = label_map[i];
        label_all_points(&condensed, &selected, n, i, label, &mut labels);
    }

    labels
}

/// Replace every selected cluster born below `epsilon` (in distance units) by its
/// closest ancestor born above it, never climbing into the root.
fn apply_selection_epsilon(
    selected: &mut [bool],
    children: &[Vec<usize>],
    parent_of: &[Option<usize>],
    lambda_birth: &[f64],
    epsilon: f64,
) {
    let birth_distance = |c: usize| {
        if lambda_birth[c] > 0.0 {
            1.0 / lambda_birth[c]
        } else {
            f64::INFINITY
        }
    };

    let mut result = vec![false; selected.len()];
    for cluster in (0..selected.len()).filter(|&c| selected[c]) {
        if birth_distance(cluster) >= epsilon {
            result[cluster] = true;
            continue;
        }
        // Climb to the first ancestor born at or beyond epsilon, stopping below the root.
        let mut node = cluster;
        while let Some(parent) = parent_of[node] {
            if parent_of[parent].is_none() {
                break;
            }
            node = parent;
            if birth_distance(parent) >= epsilon {
                break;
            }
        }
        result[node] = true;
    }

    // A promoted ancestor absorbs every selected descendant.
    for cluster in 0..result.len() {
        if result[cluster] {
            deselect_descendants(children, cluster, &mut result);
        }
    }
    selected.copy_from_slice(&result);
}

/// Add individual point fallouts for all points in the component rooted at `comp_root`.
fn add_point_fallouts(
    condensed: &mut Vec<CondensedEdge>,
    uf: &UnionFind,
    comp_root: usize,
    parent_cluster: usize,
    lambda: f64,
    n: usize,
) {
    // UnionFind does not track members; scan every point without path compression.
    for p in 0..n {
        if find_root_readonly(&uf.parent, p) == comp_root {
            condensed.push(CondensedEdge {
                parent: parent_cluster,
                child: p,
                lambda,
                child_size: 1,
            });
        }
    }
}

fn find_root_readonly(parent: &[usize], mut x: usize) -> usize {
    while parent[x] != x {
        x = parent[x];
    }
    x
}

/// Label all points belonging to cluster `cluster_idx` (and non-selected descendants).
fn label_all_points(
    condensed: &[CondensedEdge],
    selected: &[bool],
    n: usize,
    cluster_idx: usize,
    label: usize,
    labels: &mut [usize],
) {
    let cluster_id = cluster_idx + n;

    for edge in condensed {
        if edge.parent != cluster_id {
            continue;
        }
        if edge.child_size == 1 && edge.child < n {
            // Direct point fallout.
            labels[edge.child] = label;
        } else if edge.child_size > 1 && edge.child >= n {
            // Child cluster.
            let child_idx = edge.child - n;
            if selected[child_idx] {
                // Child is independently selected; don't override.
                continue;
            }
            // Recursively label all points in this non-selected child.
            label_all_points(condensed, selected, n, child_idx, label, labels);
        }
    }
}

fn deselect_descendants(children: &[Vec<usize>], node: usize, selected: &mut [bool]) {
    for &child in &children[node] {
        selected[child] = false;
        deselect_descendants(children, child, selected);
    }
}
