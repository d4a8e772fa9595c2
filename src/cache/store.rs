//! Cache hit/miss gate and artifact persistence.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::storage::Storage;

/// Decides hits and persists artifacts on top of a [`Storage`].
#[derive(Debug)]
pub struct CacheStore<'a, S: ?Sized> {
    storage: &'a S,
    dir_mode: u32,
    file_mode: u32,
}

impl<'a, S: Storage + ?Sized> CacheStore<'a, S> {
    pub const fn new(storage: &'a S, dir_mode: u32, file_mode: u32) -> Self {
        Self {
            storage,
            dir_mode,
            file_mode,
        }
    }

    /// Returns true if `<bucket>/<basename>` already exists.
    ///
    /// A missing bucket is created (with the directory mode) and reported as
    /// a miss; a freshly created bucket can never be a hit.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket directory cannot be created.
    pub fn has_cached(&self, bucket: &Path, basename: &str) -> Result<bool> {
        if !self.storage.is_dir(bucket) {
            if let Err(e) = self.storage.create_directory(bucket, self.dir_mode) {
                // Lost a creation race; the bucket is there now
                if !(e.is_transient() && self.storage.is_dir(bucket)) {
                    return Err(e);
                }
            }
            debug!(bucket = %bucket.display(), "Created cache bucket, miss");
            return Ok(false);
        }

        let hit = self.storage.exists(&bucket.join(basename));
        debug!(bucket = %bucket.display(), basename, hit, "Checked cache bucket");
        Ok(hit)
    }

    /// Like [`has_cached`](Self::has_cached) but never creates anything.
    pub fn peek(&self, bucket: &Path, basename: &str) -> bool {
        self.storage.exists(&bucket.join(basename))
    }

    /// Atomically write an encoded artifact with the file mode.
    ///
    /// The artifact is published with its final mode, so a hit never sees
    /// a file with other permission bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn persist(&self, bucket: &Path, basename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let artifact = bucket.join(basename);
        self.storage.write(&artifact, bytes, self.file_mode)?;
        info!(artifact = %artifact.display(), bytes = bytes.len(), "Stored cache artifact");
        Ok(artifact)
    }
}
