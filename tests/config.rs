use std::io::Write;

use depclump::affinity::Metric;
use depclump::cluster::Algorithm;
use depclump::{AnalysisConfig, Error};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_a_full_configuration() {
    let file = write_config(
        r#"
include_transitive = false
include_single_occurrence = false
algorithm = "spectral"
metric = "xor"
cluster_count = 4
test_split_fraction = 0.0
min_cluster_size = 3
cluster_selection_epsilon = 0.25
seed = 99
"#,
    );

    let config = AnalysisConfig::load(file.path()).unwrap();
    assert_eq!(
        config,
        AnalysisConfig {
            include_transitive: false,
            include_single_occurrence: false,
            algorithm: Algorithm::Spectral,
            metric: Metric::Xor,
            cluster_count: Some(4),
            test_split_fraction: 0.0,
            min_cluster_size: 3,
            cluster_selection_epsilon: 0.25,
            seed: Some(99),
        }
    );
    assert!(config.validate().is_ok());
}

#[test]
fn partial_file_keeps_defaults() {
    let file = write_config("metric = \"distance\"\n");
    let config = AnalysisConfig::load(file.path()).unwrap();
    assert_eq!(config.metric, Metric::Distance);
    assert_eq!(config.algorithm, Algorithm::Density);
    assert_eq!(config.test_split_fraction, 0.2);
    assert_eq!(config.min_cluster_size, 5);
    assert_eq!(config.cluster_selection_epsilon, 0.5);
}

#[test]
fn unknown_algorithm_fails_naming_the_value() {
    let file = write_config("algorithm = \"optics\"\n");
    let err = AnalysisConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("optics"), "{err}");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AnalysisConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn missing_cluster_count_is_caught_before_running() {
    let file = write_config("algorithm = \"aglo\"\n");
    let config = AnalysisConfig::load(file.path()).unwrap();
    assert!(matches!(
        config.validate(),
        Err(Error::MissingClusterCount {
            algorithm: "hierarchical"
        })
    ));
}
