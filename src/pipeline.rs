//! End-to-end analysis run.
//!
//! ```text
//! repositories ─ split ─┬─ train ─ vocabulary ─ vectors ─ affinity ─ similarity benchmark
//!                       │                          │          └──── clustering ─ clustering benchmark
//!                       │                          └── centroids ◄───────┘
//!                       └─ test ── vectors ─ distance-to-centroid ─ DISTANCE affinity ─ similarity benchmark
//! ```

use tracing::{info, warn};

use crate::affinity::{AffinityMetric, NegativeDistance};
use crate::benchmark::{ClusteringBenchmark, SimilarityBenchmark};
use crate::catalog::{CategoryVocabulary, DependencyVocabulary};
use crate::cluster::{build_strategy, ClusteringInput, NOISE};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::hybrid::Centroids;
use crate::repo::Repository;
use crate::report::{AnalysisReport, Assignment, HybridReport};
use crate::split::train_test_split;
use crate::vectorize::vectorize;

/// A configured analysis, runnable over any number of corpora.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the full pipeline over `repos`.
    pub fn run(&self, repos: &[Repository]) -> Result<AnalysisReport> {
        self.config.validate()?;
        if repos.is_empty() {
            return Err(Error::EmptyInput);
        }
        info!(repositories = repos.len(), "loaded repositories");

        let split = train_test_split(repos, self.config.test_split_fraction, self.config.seed)?;
        info!(
            train = split.train.len(),
            test = split.test.len(),
            "split corpus"
        );

        let vocabulary = DependencyVocabulary::build(&split.train, &self.config.catalog_policy());
        if vocabulary.is_empty() {
            return Err(Error::EmptyVocabulary);
        }
        info!(dependencies = vocabulary.len(), "extracted dependencies");

        let categories = CategoryVocabulary::from_repositories(&split.train);
        info!(categories = categories.len(), "extracted categories");
        let truth = categories.ground_truth(&split.train)?;

        let train = vectorize(&split.train, &vocabulary);
        let metric = self.config.metric.metric();
        let affinity = metric.matrix(train.vectors())?;
        let similarity = SimilarityBenchmark::evaluate(&affinity, &truth)?;
        info!(
            metric = metric.name(),
            inner = similarity.inner,
            outer = ?similarity.outer,
            "benchmarked similarity"
        );

        let strategy = build_strategy(&self.config)?;
        let input = ClusteringInput::new(train.vectors(), &affinity, metric);
        let predicted = strategy.cluster(&input)?;
        let clustering = ClusteringBenchmark::evaluate(&truth, &predicted, &categories)?;
        info!(
            algorithm = strategy.name(),
            clusters = clustering.cluster_count,
            noise = clustering.noise_count,
            rand_index = clustering.rand_index,
            nmi = clustering.normalized_mutual_info,
            "benchmarked clustering"
        );

        let hybrid = evaluate_hybrid(
            &split.test,
            &vocabulary,
            &categories,
            train.vectors(),
            &predicted,
        )?;

        let assignments = split
            .train
            .iter()
            .zip(&predicted)
            .map(|(repo, &label)| Assignment {
                id: repo.id.clone(),
                category: repo.category.clone(),
                cluster: (label != NOISE).then_some(label),
            })
            .collect();

        Ok(AnalysisReport {
            repositories: repos.len(),
            train_size: split.train.len(),
            test_size: split.test.len(),
            dependency_count: vocabulary.len(),
            categories: categories.labels().to_vec(),
            metric: self.config.metric,
            algorithm: self.config.algorithm,
            similarity,
            clustering,
            hybrid,
            assignments,
        })
    }
}

/// Score the held-out set in distance-to-centroid space.
///
/// Returns a skipped report when there is nothing to evaluate; every other
/// failure, including a held-out category unseen in training, is fatal.
fn evaluate_hybrid(
    test: &[Repository],
    vocabulary: &DependencyVocabulary,
    categories: &CategoryVocabulary,
    train_vectors: &[Vec<f32>],
    predicted: &[usize],
) -> Result<HybridReport> {
    if test.is_empty() {
        return Ok(HybridReport::Skipped {
            reason: "no held-out repositories".to_owned(),
        });
    }

    let centroids = match Centroids::from_assignments(train_vectors, predicted) {
        Ok(centroids) => centroids,
        Err(Error::NoCentroids) => {
            warn!("every training repository is noise; skipping hybrid evaluation");
            return Ok(HybridReport::Skipped {
                reason: "the clustering produced no populated cluster".to_owned(),
            });
        }
        Err(e) => return Err(e),
    };

    let truth = categories.ground_truth(test)?;
    let held_out = vectorize(test, vocabulary);
    let projected = centroids.project(held_out.vectors())?;
    let affinity = NegativeDistance.matrix(&projected)?;
    let similarity = SimilarityBenchmark::evaluate(&affinity, &truth)?;
    info!(
        test = test.len(),
        centroids = centroids.len(),
        inner = similarity.inner,
        outer = ?similarity.outer,
        "benchmarked hybrid projection"
    );

    Ok(HybridReport::Evaluated {
        test_size: test.len(),
        centroid_count: centroids.len(),
        similarity,
    })
}
