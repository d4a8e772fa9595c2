//! In-memory storage adapter.
//!
//! Keeps files, directories and permission bits in a map guarded by a
//! mutex. Used by tests and by embedders that keep artifacts in process.
//!
//! # Example
//!
//! ```rust
//! use std::path::Path;
//! use imgcache::storage::{MemoryStorage, Storage};
//!
//! let storage = MemoryStorage::new("/virtual");
//! storage.insert_file("photos/cat.png", vec![1, 2, 3]);
//!
//! assert!(storage.is_dir(Path::new("photos")));
//! assert_eq!(storage.read(Path::new("photos/cat.png")).unwrap(), vec![1, 2, 3]);
//! ```

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use super::Storage;
use crate::error::{CacheError, Result};

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
    modes: HashMap<PathBuf, u32>,
    writes: usize,
    dirs_created: usize,
}

/// Storage backed by process memory.
#[derive(Debug)]
pub struct MemoryStorage {
    base: PathBuf,
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    /// Create an empty store reporting `base` as its base folder.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not wedge the others
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seed a file, creating its parent directories.
    pub fn insert_file(&self, path: impl AsRef<Path>, bytes: Vec<u8>) {
        let path = path.as_ref();
        let mut inner = self.lock();
        for ancestor in path.ancestors().skip(1) {
            if !ancestor.as_os_str().is_empty() {
                inner.dirs.insert(ancestor.to_path_buf());
            }
        }
        inner.files.insert(path.to_path_buf(), bytes);
    }

    /// Remove a file, as an external cleanup would.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.lock().files.remove(path.as_ref()).is_some()
    }

    /// Permission bits last applied to `path`, if any.
    pub fn mode_of(&self, path: impl AsRef<Path>) -> Option<u32> {
        self.lock().modes.get(path.as_ref()).copied()
    }

    /// Number of completed `write` calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Number of directories created through `create_directory`.
    pub fn dirs_created(&self) -> usize {
        self.lock().dirs_created
    }

    /// Sorted list of stored file paths.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self.lock().files.keys().cloned().collect();
        files.sort();
        files
    }

    fn is_root(path: &Path) -> bool {
        path.as_os_str().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn base_folder(&self) -> &Path {
        &self.base
    }

    fn exists(&self, path: &Path) -> bool {
        let inner = self.lock();
        Self::is_root(path) || inner.files.contains_key(path) || inner.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        Self::is_root(path) || self.lock().dirs.contains(path)
    }

    fn create_directory(&self, path: &Path, mode: u32) -> Result<()> {
        let mut inner = self.lock();
        if inner.files.contains_key(path) {
            return Err(CacheError::storage(
                self.base.join(path),
                io::Error::new(io::ErrorKind::AlreadyExists, "a file exists at this path"),
            ));
        }

        for ancestor in path.ancestors() {
            if !Self::is_root(ancestor) && inner.dirs.insert(ancestor.to_path_buf()) {
                inner.dirs_created += 1;
                inner.modes.insert(ancestor.to_path_buf(), mode);
            }
        }
        inner.modes.insert(path.to_path_buf(), mode);
        trace!(path = %path.display(), "Created in-memory directory");
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.lock().files.get(path).cloned().ok_or_else(|| {
            CacheError::storage(self.base.join(path), io::Error::from(io::ErrorKind::NotFound))
        })
    }

    fn write(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
        let mut inner = self.lock();
        let parent_ok = path
            .parent()
            .is_none_or(|parent| Self::is_root(parent) || inner.dirs.contains(parent));
        if !parent_ok {
            return Err(CacheError::storage(
                self.base.join(path),
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }

        // Swapped in under the lock, so readers never see a partial file
        inner.files.insert(path.to_path_buf(), bytes.to_vec());
        inner.modes.insert(path.to_path_buf(), mode);
        inner.writes += 1;
        Ok(())
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        let mut inner = self.lock();
        if !inner.files.contains_key(path) && !inner.dirs.contains(path) {
            return Err(CacheError::storage(
                self.base.join(path),
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }
        inner.modes.insert(path.to_path_buf(), mode);
        Ok(())
    }
}
