//! Cache path resolution.
//!
//! Artifacts live at `<folder>/<cache-key>/<basename>`, where `folder` is
//! the source image's directory relative to the adapter's base folder, or
//! its absolute directory for an external source.
//! Nothing here touches storage, and paths are not checked for traversal;
//! callers pass trusted folders and keys from [`KeyPolicy`](super::KeyPolicy).

use std::path::{Component, Path, PathBuf};

use super::key::CacheKey;
use super::source::SourceImage;

/// Join `base_folder`, `cache_key` and `source_basename` with `/`.
///
/// A single trailing separator on `base_folder` is dropped. An empty
/// `base_folder` yields a relative `<cache_key>/<basename>`.
pub fn resolve_cache_path(base_folder: &str, source_basename: &str, cache_key: &str) -> String {
    let base = base_folder.strip_suffix('/').unwrap_or(base_folder);
    if base.is_empty() {
        format!("{cache_key}/{source_basename}")
    } else {
        format!("{base}/{cache_key}/{source_basename}")
    }
}

/// Render a path with `/` separators, as used in public URLs.
///
/// Absolute paths keep their leading `/`.
pub fn to_public(path: &Path) -> String {
    let joined = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if path.has_root() {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Computes bucket and artifact locations for a base folder.
#[derive(Debug, Clone)]
pub struct PathResolver {
    base_folder: PathBuf,
}

impl PathResolver {
    pub fn new(base_folder: impl Into<PathBuf>) -> Self {
        Self {
            base_folder: base_folder.into(),
        }
    }

    pub fn base_folder(&self) -> &Path {
        &self.base_folder
    }

    /// Bucket directory for `key`, relative to the base folder unless the
    /// source is external.
    pub fn bucket(&self, source: &SourceImage, key: &CacheKey) -> PathBuf {
        source.directory().join(key.as_path())
    }

    /// Artifact file for `key`, relative to the base folder.
    pub fn artifact(&self, source: &SourceImage, key: &CacheKey) -> PathBuf {
        PathBuf::from(resolve_cache_path(
            &to_public(source.directory()),
            source.basename(),
            key.as_str(),
        ))
    }

    /// Absolute form of a relative storage path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.base_folder.join(relative)
    }
}
