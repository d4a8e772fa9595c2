//! Local filesystem storage adapter.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{trace, warn};

use super::Storage;
use crate::error::{CacheError, Result};

/// Storage rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open a local adapter rooted at `base_folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_folder` is not an existing directory.
    pub fn new(base_folder: &Path) -> Result<Self> {
        if !base_folder.is_dir() {
            return Err(CacheError::ConfigInvalid(format!(
                "base folder is not a directory: {}",
                base_folder.display()
            )));
        }

        let root = base_folder.canonicalize().unwrap_or_else(|_| {
            warn!(base_folder = %base_folder.display(), "Failed to canonicalize base folder");
            base_folder.to_path_buf()
        });

        Ok(Self { root })
    }
}

#[cfg(unix)]
fn apply_mode(file: &fs::File, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_file: &fs::File, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

impl Storage for LocalStorage {
    fn base_folder(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.absolute(path).exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.absolute(path).is_dir()
    }

    fn create_directory(&self, path: &Path, mode: u32) -> Result<()> {
        let abs = self.absolute(path);
        trace!(path = %abs.display(), mode = %format!("{mode:o}"), "Creating directory");

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        builder
            .create(&abs)
            .map_err(|e| CacheError::storage(&abs, e))?;

        // DirBuilder modes are filtered by the umask
        self.set_permissions(path, mode)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs = self.absolute(path);
        fs::read(&abs).map_err(|e| CacheError::storage(abs, e))
    }

    fn write(&self, path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
        let abs = self.absolute(path);
        let parent = abs.parent().ok_or_else(|| {
            CacheError::Other(format!("artifact path {} has no parent", abs.display()))
        })?;

        // Temp files start at 0600; fix the mode before the rename publishes it
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| CacheError::storage(parent, e))?;
        if let Err(e) = tmp
            .write_all(bytes)
            .and_then(|()| tmp.as_file_mut().flush())
            .and_then(|()| apply_mode(tmp.as_file(), mode))
        {
            return Err(CacheError::storage(tmp.path(), e));
        }
        tmp.persist(&abs)
            .map_err(|e| CacheError::storage(&abs, e.error))?;

        trace!(path = %abs.display(), bytes = bytes.len(), mode = %format!("{mode:o}"), "Persisted file");
        Ok(())
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        let abs = self.absolute(path);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&abs, fs::Permissions::from_mode(mode))
                .map_err(|e| CacheError::storage(&abs, e))?;
        }
        #[cfg(not(unix))]
        {
            let _ = mode;
            if !abs.exists() {
                return Err(CacheError::storage(
                    &abs,
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                ));
            }
        }
        Ok(())
    }
}
