use thiserror::Error;

/// Errors returned by the analysis pipeline and its clustering algorithms.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// Two label arrays that must be index-aligned have different lengths.
    #[error("label length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// Length of the reference array.
        expected: usize,
        /// Length of the other array.
        found: usize,
    },

    /// A repository's category is missing from the category vocabulary.
    #[error("category {category:?} is not part of the category vocabulary")]
    UnknownCategory {
        /// The category that failed the lookup.
        category: String,
    },

    /// No dependency survived the catalog policy, so vectors would be zero-length.
    #[error("dependency vocabulary is empty; no well-formed dependency passed the catalog policy")]
    EmptyVocabulary,

    /// Every training point was noise or the clustering was empty.
    #[error("no populated cluster to derive a centroid from")]
    NoCentroids,

    /// The selected algorithm needs a target cluster count.
    #[error("algorithm {algorithm} requires a cluster count")]
    MissingClusterCount {
        /// Algorithm name.
        algorithm: &'static str,
    },

    /// A configuration value did not name a known variant.
    #[error("unknown {option} {value:?} (expected one of: {expected})")]
    UnknownOption {
        /// Option name.
        option: &'static str,
        /// The rejected value.
        value: String,
        /// Accepted spellings.
        expected: &'static str,
    },

    /// A configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid TOML for [`crate::config::AnalysisConfig`].
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
