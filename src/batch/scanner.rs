//! Directory scanning for cache warming.
//!
//! Finds source images under a folder so their transforms can be generated
//! ahead of the first request.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, trace};

use crate::cache::Method;
use crate::config::is_supported_image;

/// Result of scanning a directory for source images.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// Supported images, sorted by relative path.
    pub images: Vec<ImageEntry>,
    /// Files without a supported image extension.
    pub skipped: Vec<PathBuf>,
    /// Directories not descended into because they hold cache buckets.
    pub cache_dirs: Vec<PathBuf>,
}

impl ScanResult {
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// One source image found by a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ImageEntry {
    /// Full path as found on disk.
    pub path: PathBuf,
    /// Path relative to the scanned directory.
    pub relative: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// Errors that can occur during directory scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The specified directory does not exist.
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Failed to read the directory.
    #[error("failed to read directory {0}: {1}")]
    ReadError(PathBuf, #[source] io::Error),

    /// Failed to read a directory entry.
    #[error("failed to read directory entry: {0}")]
    EntryError(#[source] io::Error),

    /// Failed to get file metadata.
    #[error("failed to get file metadata for {0}: {1}")]
    MetadataError(PathBuf, #[source] io::Error),
}

/// True for folders the cache itself creates: dot folders (the hidden
/// segment), method folders, and any `bucket_dirs` named by a prefix or
/// naming override.
fn is_cache_dir(name: &str, bucket_dirs: &[&str]) -> bool {
    name.starts_with('.')
        || Method::ALL.iter().any(|m| m.as_str() == name)
        || bucket_dirs.contains(&name)
}

/// Scans `dir` for images with a supported extension.
///
/// With `recursive`, subdirectories are walked too, except folders that
/// hold previously generated artifacts: dot folders, method folders and the
/// extra `bucket_dirs` (the leading folder of a prefixed or named key).
///
/// # Example
///
/// ```ignore
/// let result = scan_images(Path::new("./public/photos"), true, &["avatar"])?;
/// for image in &result.images {
///     println!("{}", image.relative.display());
/// }
/// ```
#[instrument(skip_all, fields(dir = %dir.display(), recursive))]
pub fn scan_images(
    dir: &Path,
    recursive: bool,
    bucket_dirs: &[&str],
) -> Result<ScanResult, ScanError> {
    info!("Starting directory scan");

    if !dir.exists() {
        return Err(ScanError::DirectoryNotFound(dir.to_path_buf()));
    }

    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut result = ScanResult::default();
    let mut pending = vec![PathBuf::new()];

    while let Some(relative_dir) = pending.pop() {
        let current = dir.join(&relative_dir);
        let dir_entries =
            std::fs::read_dir(&current).map_err(|e| ScanError::ReadError(current.clone(), e))?;

        let mut entries: Vec<_> = dir_entries
            .collect::<Result<Vec<_>, io::Error>>()
            .map_err(ScanError::EntryError)?;
        entries.sort_by_key(std::fs::DirEntry::file_name);

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name();
            let relative = relative_dir.join(&name);

            if path.is_dir() {
                if !recursive {
                    trace!(path = %path.display(), "Skipping directory");
                } else if is_cache_dir(&name.to_string_lossy(), bucket_dirs) {
                    debug!(path = %path.display(), "Skipping cache directory");
                    result.cache_dirs.push(path);
                } else {
                    pending.push(relative);
                }
                continue;
            }

            if !is_supported_image(&path) {
                trace!(path = %path.display(), "Not a supported image");
                result.skipped.push(path);
                continue;
            }

            let metadata =
                std::fs::metadata(&path).map_err(|e| ScanError::MetadataError(path.clone(), e))?;
            debug!(path = %path.display(), size = metadata.len(), "Found image");
            result.images.push(ImageEntry {
                path,
                relative,
                size_bytes: metadata.len(),
            });
        }
    }

    result.images.sort_by(|a, b| a.relative.cmp(&b.relative));

    info!(
        images = result.images.len(),
        skipped = result.skipped.len(),
        cache_dirs = result.cache_dirs.len(),
        "Directory scan complete"
    );

    Ok(result)
}
