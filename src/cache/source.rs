//! Source image identification.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::trace;

use crate::error::{CacheError, Result};
use crate::storage::Storage;

/// A source image, usually inside the adapter's base folder.
///
/// Paths are relative to the base folder, or absolute for an external
/// source outside it; storage resolves both. Natural dimensions are unknown
/// until the header is probed or the image is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceImage {
    path: PathBuf,
    directory: PathBuf,
    basename: String,
    extension: String,
    dimensions: Option<(u32, u32)>,
}

fn not_found(path: &Path) -> CacheError {
    CacheError::NotFound {
        path: path.display().to_string(),
    }
}

impl SourceImage {
    /// Split a base-relative path, without checking storage.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path climbs out of the base folder or has
    /// no file name.
    pub fn from_relative(relative: &Path) -> Result<Self> {
        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(not_found(relative));
                }
            }
        }

        Self::split(normalized, relative)
    }

    /// Split an absolute path outside the base folder.
    fn from_external(absolute: &Path) -> Result<Self> {
        if absolute.components().any(|c| c == Component::ParentDir) {
            return Err(not_found(absolute));
        }
        let normalized = absolute
            .components()
            .filter(|c| *c != Component::CurDir)
            .collect();
        Self::split(normalized, absolute)
    }

    fn split(path: PathBuf, input: &Path) -> Result<Self> {
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| not_found(input))?;
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(Self {
            path,
            directory,
            basename,
            extension,
            dimensions: None,
        })
    }

    /// Resolve `input` against `storage` and check that it is a file.
    ///
    /// Relative inputs are taken relative to the base folder and may not
    /// climb out of it. Absolute inputs inside the base folder are made
    /// relative; any other existing absolute file is an external source,
    /// cached in buckets beside it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the input names no existing file under the base
    /// folder and no existing absolute file.
    pub fn resolve<S: Storage + ?Sized>(storage: &S, input: &Path) -> Result<Self> {
        let source = if input.is_absolute() {
            let base = storage.base_folder();
            let canonical = input.canonicalize().unwrap_or_else(|_| input.to_path_buf());
            match input.strip_prefix(base).or_else(|_| canonical.strip_prefix(base)) {
                Ok(relative) => Self::from_relative(relative)?,
                Err(_) => Self::from_external(&canonical)?,
            }
        } else {
            Self::from_relative(input)?
        };

        if !storage.exists(&source.path) || storage.is_dir(&source.path) {
            return Err(not_found(input));
        }

        trace!(source = %source.path.display(), "Resolved source image");
        Ok(source)
    }

    /// Path relative to the base folder; absolute for external sources.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the source lives outside the base folder.
    pub fn is_external(&self) -> bool {
        self.path.is_absolute()
    }

    /// Containing folder in the same form as [`path`](Self::path); empty at
    /// the root.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Extension without the dot; empty when there is none.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Natural (width, height), once known.
    pub const fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub(crate) fn set_dimensions(&mut self, width: u32, height: u32) {
        self.dimensions = Some((width, height));
    }
}
