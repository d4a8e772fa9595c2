//! The result of a cache request.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::key::CacheKey;
use super::path::to_public;

/// How a request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// An existing artifact was served; no codec work was done.
    Hit,
    /// The transform ran and a new artifact was written.
    Generated,
    /// The enlarge guard fired; the untouched source is served.
    Original,
    /// Located only; nothing exists at the artifact path yet.
    Missing,
}

/// Location of a served image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedArtifact {
    key: Option<CacheKey>,
    bucket: PathBuf,
    artifact: PathBuf,
    base_folder: PathBuf,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<(u32, u32)>,
}

impl CachedArtifact {
    pub(crate) fn cached(
        key: CacheKey,
        bucket: PathBuf,
        artifact: PathBuf,
        base_folder: &Path,
        outcome: Outcome,
    ) -> Self {
        Self {
            key: Some(key),
            bucket,
            artifact,
            base_folder: base_folder.to_path_buf(),
            outcome,
            dimensions: None,
        }
    }

    pub(crate) fn original(directory: &Path, source: &Path, base_folder: &Path) -> Self {
        Self {
            key: None,
            bucket: directory.to_path_buf(),
            artifact: source.to_path_buf(),
            base_folder: base_folder.to_path_buf(),
            outcome: Outcome::Original,
            dimensions: None,
        }
    }

    pub(crate) fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    /// Artifact path relative to the base folder, `/`-separated; absolute
    /// for external sources.
    pub fn public_path(&self) -> String {
        to_public(&self.artifact)
    }

    /// Absolute path of the folder holding the artifact.
    pub fn absolute_path(&self) -> PathBuf {
        self.base_folder.join(&self.bucket)
    }

    /// Absolute path of the artifact file.
    pub fn absolute_artifact_path(&self) -> PathBuf {
        self.base_folder.join(&self.artifact)
    }

    /// Artifact path in storage form (see [`public_path`](Self::public_path)).
    pub fn relative_path(&self) -> &Path {
        &self.artifact
    }

    /// The bucket key; `None` when the original is served.
    pub const fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn was_cached(&self) -> bool {
        self.outcome == Outcome::Hit
    }

    /// Output dimensions, when the artifact was generated by this request.
    pub const fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }
}

impl fmt::Display for CachedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.public_path())
    }
}
