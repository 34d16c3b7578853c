//! Repository records as produced by the dependency miner.
//!
//! The input document is a JSON array of records:
//!
//! ```json
//! [
//!   {
//!     "id": "owner/name",
//!     "category": "plugin",
//!     "dependencies": [
//!       { "provider": "maven", "id": "org.slf4j:slf4j-api", "version": "2.0.9", "type": "DIRECT" }
//!     ]
//!   }
//! ]
//! ```

use serde::{Deserialize, Serialize};

/// Separator between the group and artifact halves of a dependency identifier.
pub const ID_SEPARATOR: char = ':';

/// How a dependency entered the repository's build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyKind {
    /// Declared by the repository itself.
    Direct,
    /// Pulled in through another dependency.
    Transitive,
    /// Any other tag the miner emitted.
    #[default]
    #[serde(other)]
    Other,
}

/// A single dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Identifier, expected as `group:artifact`.
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: DependencyKind,
    /// Package ecosystem (`maven`, `npm`, `pub.dev`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Dependency {
    /// Create a declaration with no provider or version.
    pub fn new(id: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            id: id.into(),
            kind,
            provider: None,
            version: None,
        }
    }

    /// Split the identifier into `(group, artifact)`.
    ///
    /// Returns `None` unless the identifier has exactly one separator with a
    /// non-empty part on each side.
    pub fn coordinates(&self) -> Option<(&str, &str)> {
        let mut parts = self.id.split(ID_SEPARATOR);
        let group = parts.next()?;
        let artifact = parts.next()?;
        if parts.next().is_some() || group.is_empty() || artifact.is_empty() {
            return None;
        }
        Some((group, artifact))
    }

    /// Whether the identifier is well-formed (see [`Dependency::coordinates`]).
    pub fn is_well_formed(&self) -> bool {
        self.coordinates().is_some()
    }
}

/// A mined repository with its category label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Unique identifier, usually `owner/name`.
    pub id: String,
    /// Ground-truth category label.
    pub category: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Repository {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            dependencies,
        }
    }

    /// Convenience constructor where every dependency is direct.
    pub fn with_direct(
        id: impl Into<String>,
        category: impl Into<String>,
        dependency_ids: &[&str],
    ) -> Self {
        let dependencies = dependency_ids
            .iter()
            .map(|d| Dependency::new(*d, DependencyKind::Direct))
            .collect();
        Self::new(id, category, dependencies)
    }
}
