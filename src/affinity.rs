//! Pairwise similarity between feature vectors.
//!
//! Three interchangeable measures share one convention: larger means more
//! similar.
//!
//! | Metric | Definition | Range |
//! |--------|------------|-------|
//! | AND-max | `\|a ∧ b\| / max(\|a\|, \|b\|)`, 0 if either side is empty | [0, 1] |
//! | XOR | `1 - \|a ⊕ b\| / d` | [0, 1] |
//! | Distance | `-‖a - b‖₂` | (-∞, 0] |
//!
//! Every ordered pair is computed, including `(i, i)` and both `(i, j)` and
//! `(j, i)`. That is O(N²·D), fine for a few thousand repositories.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dense square matrix of pairwise affinities (row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl AffinityMatrix {
    /// Wrap row-major `values` of an `n x n` matrix.
    pub fn from_vec(n: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != n * n {
            return Err(Error::DimensionMismatch {
                expected: n * n,
                found: values.len(),
            });
        }
        Ok(Self { n, values })
    }

    /// Build from nested rows; every row must have `rows.len()` entries.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        let mut values = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self { n, values })
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Apply `f` to every entry.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            n: self.n,
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Distance view of this similarity matrix under `metric`.
    pub fn to_distances(&self, metric: &dyn AffinityMetric) -> Self {
        self.map(|s| metric.to_distance(s))
    }

    /// Non-negative kernel view of this similarity matrix under `metric`.
    pub fn to_kernel(&self, metric: &dyn AffinityMetric) -> Self {
        self.map(|s| metric.to_kernel(s))
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        (0..self.n).all(|i| {
            ((i + 1)..self.n).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tolerance)
        })
    }
}

/// A pairwise similarity measure over equal-length vectors.
pub trait AffinityMetric: Send + Sync {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Similarity of `a` and `b`; larger is more similar.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f64;

    /// Convert a similarity produced by this metric into a non-negative distance.
    fn to_distance(&self, similarity: f64) -> f64 {
        1.0 - similarity
    }

    /// Map a similarity produced by this metric onto a non-negative kernel weight.
    ///
    /// Metrics whose similarities already lie in `[0, 1]` pass them through.
    fn to_kernel(&self, similarity: f64) -> f64 {
        similarity
    }

    /// All-pairs matrix over `vectors`.
    fn matrix(&self, vectors: &[Vec<f32>]) -> Result<AffinityMatrix> {
        let n = vectors.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let d = vectors[0].len();
        if d == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        for v in vectors.iter().skip(1) {
            if v.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: v.len(),
                });
            }
        }

        let mut values = vec![0.0f64; n * n];
        values.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
            for (j, slot) in row.iter_mut().enumerate() {
                *slot = self.similarity(&vectors[i], &vectors[j]);
            }
        });
        Ok(AffinityMatrix { n, values })
    }
}

#[inline]
fn nonzero(v: &[f32]) -> usize {
    v.iter().filter(|&&x| x != 0.0).count()
}

/// Overlap of the active sets, normalized by the larger one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AndMax;

impl AffinityMetric for AndMax {
    fn name(&self) -> &'static str {
        "AND"
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let na = nonzero(a);
        let nb = nonzero(b);
        if na == 0 || nb == 0 {
            return 0.0;
        }
        let overlap = a
            .iter()
            .zip(b)
            .filter(|&(&x, &y)| x != 0.0 && y != 0.0)
            .count();
        overlap as f64 / na.max(nb) as f64
    }
}

/// One minus the fraction of disagreeing axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xor;

impl AffinityMetric for Xor {
    fn name(&self) -> &'static str {
        "XOR"
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        if a.is_empty() {
            return 1.0;
        }
        let differing = a
            .iter()
            .zip(b)
            .filter(|&(&x, &y)| (x != 0.0) != (y != 0.0))
            .count();
        1.0 - differing as f64 / a.len() as f64
    }
}

/// Negated Euclidean distance, so that identical vectors score highest (0).
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeDistance;

impl AffinityMetric for NegativeDistance {
    fn name(&self) -> &'static str {
        "DISTANCE"
    }

    fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        -euclidean(a, b)
    }

    fn to_distance(&self, similarity: f64) -> f64 {
        -similarity
    }

    /// `exp(-d)`: identical vectors weigh 1, distant ones decay towards 0.
    fn to_kernel(&self, similarity: f64) -> f64 {
        similarity.exp()
    }
}

/// Euclidean distance accumulated in `f64`.
#[inline]
pub fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Configured choice of affinity metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", rename_all = "lowercase")]
pub enum Metric {
    #[default]
    And,
    Xor,
    Distance,
}

impl Metric {
    pub const EXPECTED: &'static str = "and, xor, distance";

    /// The metric implementation for this choice.
    pub fn metric(self) -> &'static dyn AffinityMetric {
        match self {
            Metric::And => &AndMax,
            Metric::Xor => &Xor,
            Metric::Distance => &NegativeDistance,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::And => "and",
            Metric::Xor => "xor",
            Metric::Distance => "distance",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" | "and-max" => Ok(Metric::And),
            "xor" => Ok(Metric::Xor),
            "distance" | "dist" => Ok(Metric::Distance),
            _ => Err(Error::UnknownOption {
                option: "affinity metric",
                value: s.to_owned(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn and_self_similarity_is_one() {
        let a = [1.0, 0.0, 1.0, 1.0];
        assert!((AndMax.similarity(&a, &a) - 1.0).abs() < EPS);
    }

    #[test]
    fn and_with_zero_vector_is_zero() {
        let a = [1.0, 0.0, 1.0];
        let z = [0.0, 0.0, 0.0];
        assert_eq!(AndMax.similarity(&a, &z), 0.0);
        assert_eq!(AndMax.similarity(&z, &a), 0.0);
        assert_eq!(AndMax.similarity(&z, &z), 0.0);
    }

    #[test]
    fn and_normalizes_by_larger_set() {
        let a = [1.0, 1.0, 0.0, 0.0];
        let b = [1.0, 1.0, 1.0, 1.0];
        assert!((AndMax.similarity(&a, &b) - 0.5).abs() < EPS);
        assert!((AndMax.similarity(&b, &a) - 0.5).abs() < EPS);
    }

    #[test]
    fn xor_counts_disagreements() {
        let a = [1.0, 0.0, 1.0, 0.0];
        let b = [1.0, 1.0, 0.0, 0.0];
        assert!((Xor.similarity(&a, &a) - 1.0).abs() < EPS);
        assert!((Xor.similarity(&a, &b) - 0.5).abs() < EPS);
    }

    #[test]
    fn distance_is_non_positive() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_eq!(NegativeDistance.similarity(&a, &a), 0.0);
        assert!((NegativeDistance.similarity(&a, &b) + 5.0).abs() < EPS);
        assert!((NegativeDistance.to_distance(-5.0) - 5.0).abs() < EPS);
    }

    #[test]
    fn matrix_covers_all_ordered_pairs() {
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let m = AndMax.matrix(&vectors).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(0, 2), 0.0);
        assert_eq!(m.row(2), &[0.0, 0.0, 1.0]);
        assert!(m.is_symmetric(0.0));
    }

    #[test]
    fn matrix_rejects_bad_shapes() {
        assert!(matches!(Xor.matrix(&[]), Err(Error::EmptyInput)));
        assert!(matches!(
            Xor.matrix(&[vec![], vec![]]),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            Xor.matrix(&[vec![1.0], vec![1.0, 0.0]]),
            Err(Error::DimensionMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("AND".parse::<Metric>().unwrap(), Metric::And);
        assert_eq!("dist".parse::<Metric>().unwrap(), Metric::Distance);
        assert_eq!(Metric::Xor.metric().name(), "XOR");

        let err = "cosine".parse::<Metric>().unwrap_err();
        assert!(err.to_string().contains("cosine"));
    }

    #[test]
    fn to_distances_inverts_similarity() {
        let m = AffinityMatrix::from_rows(&[vec![1.0, 0.25], vec![0.25, 1.0]]).unwrap();
        let d = m.to_distances(Metric::And.metric());
        assert_eq!(d.values(), &[0.0, 0.75, 0.75, 0.0]);
    }

    #[test]
    fn kernel_is_non_negative_for_every_metric() {
        let vectors = vec![vec![1.0, 0.0, 1.0], vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]];
        for metric in [Metric::And, Metric::Xor, Metric::Distance] {
            let m = metric.metric();
            let kernel = m.matrix(&vectors).unwrap().to_kernel(m);
            assert!(kernel.values().iter().all(|&w| w >= 0.0), "{metric:?}");
        }

        let m = AffinityMatrix::from_rows(&[vec![0.0, -2.0], vec![-2.0, 0.0]]).unwrap();
        let kernel = m.to_kernel(Metric::Distance.metric());
        assert_eq!(kernel.get(0, 0), 1.0);
        assert!((kernel.get(0, 1) - (-2.0f64).exp()).abs() < EPS);
        assert_eq!(m.to_kernel(Metric::And.metric()), m);
    }
}
