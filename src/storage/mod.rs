//! Storage abstraction behind the image cache.
//!
//! This module provides a trait-based abstraction over the filesystem
//! backing a base folder, enabling the cache to run against a real
//! directory or an in-memory map in tests.
//!
//! # Implementation Notes
//!
//! - All paths passed to a [`Storage`] are relative to its base folder
//! - `write` must be atomic: readers see either no file or the whole file,
//!   already carrying its final permission bits
//! - `create_directory` creates missing parents and tolerates a directory
//!   that already exists

mod local;
pub mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CacheError, Result};

/// Storage operations the cache core relies on.
pub trait Storage: Send + Sync {
    /// Absolute root all relative paths resolve against.
    fn base_folder(&self) -> &Path;

    /// Returns true if a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns true if a directory exists at `path`.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents with `mode` permission bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_directory(&self, path: &Path, mode: u32) -> Result<()>;

    /// Read a whole file.
    ///
    /// # Errors
    ///
    /// Returns a storage error with kind `NotFound` if the file is missing.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Atomically replace the file at `path` with `bytes`, created with
    /// `mode` permission bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory is missing or the write fails.
    fn write(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()>;

    /// Apply permission bits to an existing file or directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is missing.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    /// Absolute form of a relative storage path.
    fn absolute(&self, path: &Path) -> PathBuf {
        self.base_folder().join(path)
    }
}

/// Type alias for boxed trait object.
pub type BoxedStorage = Box<dyn Storage>;

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn base_folder(&self) -> &Path {
        (**self).base_folder()
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn create_directory(&self, path: &Path, mode: u32) -> Result<()> {
        (**self).create_directory(path, mode)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
        (**self).write(path, bytes, mode)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        (**self).set_permissions(path, mode)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        (**self).absolute(path)
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Local filesystem directory.
    #[default]
    Local,
    /// Process-local in-memory map (nothing persists).
    Memory,
}

/// Resolve the storage backend for a base folder.
///
/// # Errors
///
/// Returns an error if a local base folder does not exist or is not a
/// directory.
pub fn open_adapter(kind: AdapterKind, base_folder: &Path) -> Result<BoxedStorage> {
    debug!(?kind, base_folder = %base_folder.display(), "Opening storage adapter");
    match kind {
        AdapterKind::Local => Ok(Box::new(LocalStorage::new(base_folder)?)),
        AdapterKind::Memory => Ok(Box::new(MemoryStorage::new(base_folder))),
    }
}

/// Map a missing-file storage error onto `NotFound` for `path`.
pub(crate) fn not_found_for(err: CacheError, path: &Path) -> CacheError {
    match err {
        CacheError::Storage { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            CacheError::NotFound {
                path: path.display().to_string(),
            }
        }
        other => other,
    }
}
