//! Vocabularies derived from a repository set.
//!
//! Both vocabularies are built once from the training split and then threaded
//! through every later step, so vector axes and label indices mean the same
//! thing for training and held-out repositories.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::error::{Error, Result};
use crate::repo::{DependencyKind, Repository};

/// Inclusion policy for the dependency vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogPolicy {
    /// Count `TRANSITIVE` declarations.
    pub include_transitive: bool,
    /// Keep identifiers whose occurrence count is 1.
    pub include_single_occurrence: bool,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            include_transitive: true,
            include_single_occurrence: true,
        }
    }
}

/// Sorted, deduplicated dependency identifiers: the axes of every feature vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyVocabulary {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl DependencyVocabulary {
    /// Build the vocabulary of `repos` under `policy`.
    ///
    /// Occurrences are counted per declaration, not per repository: a repository
    /// that lists the same identifier twice contributes two occurrences.
    pub fn build(repos: &[Repository], policy: &CatalogPolicy) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut malformed = 0usize;
        let mut transitive = 0usize;

        for repo in repos {
            for dependency in &repo.dependencies {
                if !dependency.is_well_formed() {
                    malformed += 1;
                    continue;
                }
                if !policy.include_transitive && dependency.kind == DependencyKind::Transitive {
                    transitive += 1;
                    continue;
                }
                *counts.entry(dependency.id.as_str()).or_insert(0) += 1;
            }
        }

        let seen = counts.len();
        if !policy.include_single_occurrence {
            counts.retain(|_, count| *count > 1);
        }

        debug!(
            malformed,
            transitive,
            seen,
            kept = counts.len(),
            "built dependency vocabulary"
        );

        Self::from_sorted(counts.into_keys().map(str::to_owned).collect())
    }

    /// Build a vocabulary from arbitrary identifiers (sorted and deduplicated here).
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        Self::from_sorted(set.into_iter().collect())
    }

    fn from_sorted(ids: Vec<String>) -> Self {
        let positions = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self { ids, positions }
    }

    /// Axis index of `id`, if it is part of the vocabulary.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Distinct category labels, sorted; a label's index is its ground-truth cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryVocabulary {
    labels: Vec<String>,
}

impl CategoryVocabulary {
    /// Collect the categories present in `repos`.
    pub fn from_repositories(repos: &[Repository]) -> Self {
        let set: BTreeSet<&str> = repos.iter().map(|r| r.category.as_str()).collect();
        Self {
            labels: set.into_iter().map(str::to_owned).collect(),
        }
    }

    /// Ground-truth label of a single repository.
    pub fn label_of(&self, repo: &Repository) -> Result<usize> {
        self.index_of(&repo.category)
    }

    pub fn index_of(&self, category: &str) -> Result<usize> {
        self.labels
            .binary_search_by(|label| label.as_str().cmp(category))
            .map_err(|_| Error::UnknownCategory {
                category: category.to_owned(),
            })
    }

    /// Ground-truth labels of `repos`, in order.
    pub fn ground_truth(&self, repos: &[Repository]) -> Result<Vec<usize>> {
        repos.iter().map(|r| self.label_of(r)).collect()
    }

    pub fn name(&self, label: usize) -> Option<&str> {
        self.labels.get(label).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
