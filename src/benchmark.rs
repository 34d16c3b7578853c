//! Scoring similarity matrices and clusterings against ground-truth categories.
//!
//! Two questions are answered here:
//!
//! - **Does the metric separate categories?** [`SimilarityBenchmark`] compares
//!   the mean affinity inside each category with the mean affinity between
//!   that category and the rest.
//! - **Does the clustering recover categories?** [`ClusteringBenchmark`] reports
//!   the rand index, normalized mutual information and a per-cluster category
//!   composition table.
//!
//! Rand index and NMI follow the usual contingency-table definitions:
//!
//! ```text
//! RI  = (C(n,2) + 2 Σ C(n_ij,2) - Σ C(a_i,2) - Σ C(b_j,2)) / C(n,2)
//! NMI = MI(U, V) / ((H(U) + H(V)) / 2)
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::affinity::AffinityMatrix;
use crate::catalog::CategoryVocabulary;
use crate::cluster::NOISE;
use crate::error::{Error, Result};

/// Inner versus outer mean affinity, averaged over ground-truth groups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityBenchmark {
    /// Mean over groups of the mean affinity among the group's members (self-pairs included).
    pub inner: f64,
    /// Mean over groups of the mean affinity between the group and every other item.
    ///
    /// Groups without outside items do not contribute; `None` when no group has any.
    pub outer: Option<f64>,
    /// `inner / outer`; `+inf` when `outer` is zero and `inner` is positive.
    pub ratio: Option<f64>,
    /// Number of distinct ground-truth labels evaluated.
    pub groups: usize,
}

impl SimilarityBenchmark {
    /// Evaluate `affinity` against one ground-truth label per row.
    pub fn evaluate(affinity: &AffinityMatrix, truth: &[usize]) -> Result<Self> {
        if truth.len() != affinity.len() {
            return Err(Error::LengthMismatch {
                expected: affinity.len(),
                found: truth.len(),
            });
        }
        if truth.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in truth.iter().enumerate() {
            groups.entry(label).or_default().push(i);
        }

        let mut inner_total = 0.0;
        let mut outer_total = 0.0;
        let mut outer_groups = 0usize;
        for (&label, members) in &groups {
            let mut sum = 0.0;
            for &i in members {
                for &j in members {
                    sum += affinity.get(i, j);
                }
            }
            inner_total += sum / (members.len() * members.len()) as f64;

            let outside = truth.len() - members.len();
            if outside == 0 {
                continue;
            }
            let mut sum = 0.0;
            for &i in members {
                for (j, &other) in truth.iter().enumerate() {
                    if other != label {
                        sum += affinity.get(i, j);
                    }
                }
            }
            outer_total += sum / (members.len() * outside) as f64;
            outer_groups += 1;
        }

        let inner = inner_total / groups.len() as f64;
        let outer = (outer_groups > 0).then(|| outer_total / outer_groups as f64);
        let ratio = outer.and_then(|outer| separation_ratio(inner, outer));

        Ok(Self {
            inner,
            outer,
            ratio,
            groups: groups.len(),
        })
    }
}

fn separation_ratio(inner: f64, outer: f64) -> Option<f64> {
    if outer != 0.0 {
        Some(inner / outer)
    } else if inner > 0.0 {
        Some(f64::INFINITY)
    } else {
        None
    }
}

/// Members of one predicted cluster, broken down by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterComposition {
    /// Predicted label; `None` for the noise group.
    pub label: Option<usize>,
    /// Number of members.
    pub size: usize,
    /// Member count for every category, in category order (zeros included).
    pub counts: Vec<CategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

impl ClusterComposition {
    /// The category with the most members (first on ties).
    pub fn dominant(&self) -> Option<&CategoryCount> {
        self.counts
            .iter()
            .filter(|c| c.count > 0)
            .fold(None, |best: Option<&CategoryCount>, c| match best {
                Some(b) if b.count >= c.count => Some(b),
                _ => Some(c),
            })
    }
}

/// Agreement between a predicted clustering and the ground truth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringBenchmark {
    pub rand_index: f64,
    pub normalized_mutual_info: f64,
    /// Distinct non-noise predicted labels.
    pub cluster_count: usize,
    /// Items labeled [`NOISE`].
    pub noise_count: usize,
    /// One row per predicted cluster in label order, noise last.
    pub composition: Vec<ClusterComposition>,
}

impl ClusteringBenchmark {
    /// Score `predicted` against `truth`; both must have the same length.
    pub fn evaluate(
        truth: &[usize],
        predicted: &[usize],
        categories: &CategoryVocabulary,
    ) -> Result<Self> {
        let rand_index = rand_index(truth, predicted)?;
        let normalized_mutual_info = normalized_mutual_info(truth, predicted)?;
        let composition = composition(truth, predicted, categories);

        let noise_count = predicted.iter().filter(|&&l| l == NOISE).count();
        let cluster_count = composition.iter().filter(|c| c.label.is_some()).count();

        Ok(Self {
            rand_index,
            normalized_mutual_info,
            cluster_count,
            noise_count,
            composition,
        })
    }
}

/// Per-cluster category counts.
///
/// Items whose index lies past the end of `predicted` are skipped, as are
/// ground-truth labels outside `categories`.
pub fn composition(
    truth: &[usize],
    predicted: &[usize],
    categories: &CategoryVocabulary,
) -> Vec<ClusterComposition> {
    let mut tables: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (&category, &label) in truth.iter().zip(predicted) {
        if category >= categories.len() {
            continue;
        }
        tables
            .entry(label)
            .or_insert_with(|| vec![0; categories.len()])[category] += 1;
    }

    // NOISE is usize::MAX, so the BTreeMap already yields it last.
    tables
        .into_iter()
        .map(|(label, counts)| ClusterComposition {
            label: (label != NOISE).then_some(label),
            size: counts.iter().sum(),
            counts: categories
                .labels()
                .iter()
                .zip(counts)
                .map(|(category, count)| CategoryCount {
                    category: category.clone(),
                    count,
                })
                .collect(),
        })
        .collect()
}

fn check_lengths(truth: &[usize], predicted: &[usize]) -> Result<()> {
    if truth.len() != predicted.len() {
        return Err(Error::LengthMismatch {
            expected: truth.len(),
            found: predicted.len(),
        });
    }
    Ok(())
}

struct Contingency {
    n: usize,
    joint: HashMap<(usize, usize), usize>,
    truth: HashMap<usize, usize>,
    predicted: HashMap<usize, usize>,
}

impl Contingency {
    fn new(truth: &[usize], predicted: &[usize]) -> Self {
        let mut joint = HashMap::new();
        let mut t = HashMap::new();
        let mut p = HashMap::new();
        for (&a, &b) in truth.iter().zip(predicted) {
            *joint.entry((a, b)).or_insert(0) += 1;
            *t.entry(a).or_insert(0) += 1;
            *p.entry(b).or_insert(0) += 1;
        }
        Self {
            n: truth.len(),
            joint,
            truth: t,
            predicted: p,
        }
    }
}

#[inline]
fn comb2(n: usize) -> f64 {
    (n as f64) * (n as f64 - 1.0) / 2.0
}

fn entropy(counts: &HashMap<usize, usize>, n: f64) -> f64 {
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            if p > 0.0 {
                -p * p.ln()
            } else {
                0.0
            }
        })
        .sum()
}

/// Fraction of item pairs on which both labelings agree (same group or different groups).
///
/// Fewer than two items count as perfect agreement.
pub fn rand_index(truth: &[usize], predicted: &[usize]) -> Result<f64> {
    check_lengths(truth, predicted)?;
    let table = Contingency::new(truth, predicted);
    let pairs = comb2(table.n);
    if pairs == 0.0 {
        return Ok(1.0);
    }

    let same_both: f64 = table.joint.values().map(|&c| comb2(c)).sum();
    let same_truth: f64 = table.truth.values().map(|&c| comb2(c)).sum();
    let same_predicted: f64 = table.predicted.values().map(|&c| comb2(c)).sum();

    let agreements = pairs + 2.0 * same_both - same_truth - same_predicted;
    Ok(agreements / pairs)
}

/// Mutual information normalized by the arithmetic mean of both entropies.
///
/// Two single-group labelings (or two empty ones) are a perfect match (1.0);
/// zero mutual information gives 0.0.
pub fn normalized_mutual_info(truth: &[usize], predicted: &[usize]) -> Result<f64> {
    check_lengths(truth, predicted)?;
    let table = Contingency::new(truth, predicted);
    if table.truth.len() == table.predicted.len()
        && (table.truth.len() == 1 || table.truth.is_empty())
    {
        return Ok(1.0);
    }

    let n = table.n as f64;
    let mi: f64 = table
        .joint
        .iter()
        .map(|(&(a, b), &count)| {
            let p_joint = count as f64 / n;
            let p_a = table.truth[&a] as f64 / n;
            let p_b = table.predicted[&b] as f64 / n;
            p_joint * (p_joint / (p_a * p_b)).ln()
        })
        .sum();
    if mi.abs() < 1e-15 {
        return Ok(0.0);
    }

    let normalizer = (entropy(&table.truth, n) + entropy(&table.predicted, n)) / 2.0;
    Ok((mi / normalizer.max(f64::EPSILON)).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::Repository;

    const EPS: f64 = 1e-12;

    fn categories(names: &[&str]) -> CategoryVocabulary {
        let repos: Vec<Repository> = names
            .iter()
            .enumerate()
            .map(|(i, c)| Repository::with_direct(format!("r{i}"), *c, &[]))
            .collect();
        CategoryVocabulary::from_repositories(&repos)
    }

    #[test]
    fn perfect_separation_has_infinite_ratio() {
        let m = AffinityMatrix::from_rows(&[
            vec![1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let b = SimilarityBenchmark::evaluate(&m, &[0, 0, 1]).unwrap();
        assert!((b.inner - 1.0).abs() < EPS);
        assert_eq!(b.outer, Some(0.0));
        assert_eq!(b.ratio, Some(f64::INFINITY));
        assert_eq!(b.groups, 2);
    }

    #[test]
    fn single_group_has_no_outer() {
        let m = AffinityMatrix::from_rows(&[vec![1.0, 0.5], vec![0.5, 1.0]]).unwrap();
        let b = SimilarityBenchmark::evaluate(&m, &[3, 3]).unwrap();
        assert!((b.inner - 0.75).abs() < EPS);
        assert_eq!(b.outer, None);
        assert_eq!(b.ratio, None);
    }

    #[test]
    fn inner_and_outer_are_averaged_per_group() {
        // Group 0 = {0, 1}, group 1 = {2}.
        let m = AffinityMatrix::from_rows(&[
            vec![1.0, 0.5, 0.2],
            vec![0.5, 1.0, 0.4],
            vec![0.2, 0.4, 1.0],
        ])
        .unwrap();
        let b = SimilarityBenchmark::evaluate(&m, &[0, 0, 1]).unwrap();
        // inner: group 0 = 3.0 / 4, group 1 = 1.0
        assert!((b.inner - (0.75 + 1.0) / 2.0).abs() < EPS);
        // outer: group 0 = (0.2 + 0.4) / 2, group 1 = (0.2 + 0.4) / 2
        let outer = b.outer.unwrap();
        assert!((outer - 0.3).abs() < EPS);
        assert!((b.ratio.unwrap() - 0.875 / 0.3).abs() < 1e-9);
    }

    #[test]
    fn similarity_benchmark_checks_lengths() {
        let m = AffinityMatrix::from_rows(&[vec![1.0]]).unwrap();
        assert!(matches!(
            SimilarityBenchmark::evaluate(&m, &[0, 1]),
            Err(Error::LengthMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn rand_index_known_values() {
        assert!((rand_index(&[0, 0, 1, 1], &[1, 1, 0, 0]).unwrap() - 1.0).abs() < EPS);
        // Only (0,3) and (1,2) are split by both labelings.
        assert!((rand_index(&[0, 0, 1, 1], &[0, 1, 0, 1]).unwrap() - 2.0 / 6.0).abs() < EPS);
        assert!((rand_index(&[0, 0, 0, 1, 1, 1], &[0, 0, 1, 1, 2, 2]).unwrap() - 10.0 / 15.0).abs() < EPS);
        assert_eq!(rand_index(&[4], &[2]).unwrap(), 1.0);
    }

    #[test]
    fn nmi_known_values() {
        assert!((normalized_mutual_info(&[0, 0, 1, 1], &[5, 5, 7, 7]).unwrap() - 1.0).abs() < EPS);
        assert_eq!(normalized_mutual_info(&[0, 0, 1, 1], &[0, 1, 0, 1]).unwrap(), 0.0);
        assert_eq!(normalized_mutual_info(&[1, 1, 1], &[0, 0, 0]).unwrap(), 1.0);
        assert_eq!(normalized_mutual_info(&[0, 1, 2], &[0, 0, 0]).unwrap(), 0.0);

        let nmi = normalized_mutual_info(&[0, 0, 1, 1], &[0, 0, 0, 1]).unwrap();
        let ln = |x: f64| x.ln();
        let mi = 0.5 * ln(0.5 / (0.5 * 0.75)) + 0.25 * ln(0.25 / (0.5 * 0.75)) + 0.25 * ln(0.25 / (0.5 * 0.25));
        let h_truth = ln(2.0);
        let h_pred = -(0.75 * ln(0.75) + 0.25 * ln(0.25));
        assert!((nmi - mi / ((h_truth + h_pred) / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn scores_reject_mismatched_lengths() {
        assert!(matches!(
            rand_index(&[0, 1], &[0]),
            Err(Error::LengthMismatch { expected: 2, found: 1 })
        ));
        assert!(normalized_mutual_info(&[0], &[0, 1]).is_err());
    }

    #[test]
    fn composition_counts_categories_and_keeps_noise_last() {
        let cats = categories(&["mod", "plugin"]);
        let truth = [0, 0, 1, 1, 1];
        let predicted = [1, NOISE, 1, 0, 0];
        let rows = composition(&truth, &predicted, &cats);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, Some(0));
        assert_eq!(rows[0].size, 2);
        assert_eq!(rows[0].counts[1].category, "plugin");
        assert_eq!(rows[0].counts[1].count, 2);
        assert_eq!(rows[0].counts[0].count, 0);
        assert_eq!(rows[1].label, Some(1));
        assert_eq!(rows[1].size, 2);
        assert_eq!(rows[2].label, None);
        assert_eq!(rows[2].size, 1);
        assert_eq!(rows[2].dominant().map(|c| c.category.as_str()), Some("mod"));
    }

    #[test]
    fn composition_skips_items_past_predictions() {
        let cats = categories(&["a", "b"]);
        let rows = composition(&[0, 1, 1], &[0], &cats);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].size, 1);
    }

    #[test]
    fn clustering_benchmark_summary() {
        let cats = categories(&["a", "b"]);
        let b = ClusteringBenchmark::evaluate(&[0, 0, 1, 1], &[0, 0, 1, NOISE], &cats).unwrap();
        assert_eq!(b.cluster_count, 2);
        assert_eq!(b.noise_count, 1);
        assert_eq!(b.composition.len(), 3);
        assert!(b.rand_index > 0.5);
        assert!(ClusteringBenchmark::evaluate(&[0, 0], &[0], &cats).is_err());
    }
}
