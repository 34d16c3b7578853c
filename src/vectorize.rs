//! Binary dependency-presence vectors.

use crate::catalog::DependencyVocabulary;
use crate::repo::Repository;

/// One feature vector per repository, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVectors {
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl FeatureVectors {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Rows, index-aligned with [`FeatureVectors::ids`].
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Vector of the first repository with identifier `id`.
    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.ids
            .iter()
            .position(|i| i == id)
            .map(|idx| self.vectors[idx].as_slice())
    }

    /// Length of every vector (the vocabulary size).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Map each repository onto `vocabulary`: axis `i` is 1.0 iff the repository
/// declares `vocabulary.ids()[i]`.
///
/// Only vocabulary membership is checked. Declarations outside the vocabulary
/// (malformed, filtered, or unseen in the training set) leave no trace.
pub fn vectorize(repos: &[Repository], vocabulary: &DependencyVocabulary) -> FeatureVectors {
    let dimension = vocabulary.len();
    let mut ids = Vec::with_capacity(repos.len());
    let mut vectors = Vec::with_capacity(repos.len());

    for repo in repos {
        let mut vector = vec![0.0f32; dimension];
        for dependency in &repo.dependencies {
            if let Some(axis) = vocabulary.position(&dependency.id) {
                vector[axis] = 1.0;
            }
        }
        ids.push(repo.id.clone());
        vectors.push(vector);
    }

    FeatureVectors {
        ids,
        vectors,
        dimension,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogPolicy;

    #[test]
    fn presence_flags_follow_vocabulary_order() {
        let repos = vec![
            Repository::with_direct("A", "mod", &["g1:a"]),
            Repository::with_direct("B", "mod", &["g1:a", "g1:a"]),
            Repository::with_direct("C", "plugin", &["g2:b", "badid"]),
        ];
        let vocab = DependencyVocabulary::build(&repos, &CatalogPolicy::default());
        let vectors = vectorize(&repos, &vocab);

        assert_eq!(vectors.dimension(), 2);
        assert_eq!(vectors.ids(), ["A", "B", "C"]);
        assert_eq!(vectors.get("A"), Some(&[1.0, 0.0][..]));
        assert_eq!(vectors.get("B"), Some(&[1.0, 0.0][..]));
        assert_eq!(vectors.get("C"), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn held_out_repos_drop_unknown_axes() {
        let vocab = DependencyVocabulary::from_ids(["g1:a", "g2:b"]);
        let held_out = vec![Repository::with_direct("T", "mod", &["g9:z", "g2:b"])];
        let vectors = vectorize(&held_out, &vocab);
        assert_eq!(vectors.vectors(), [vec![0.0f32, 1.0]]);
    }

    #[test]
    fn repo_without_dependencies_is_zero() {
        let vocab = DependencyVocabulary::from_ids(["g1:a"]);
        let repos = vec![Repository::with_direct("E", "mod", &[])];
        let vectors = vectorize(&repos, &vocab);
        assert_eq!(vectors.vectors(), [vec![0.0f32]]);
    }
}
