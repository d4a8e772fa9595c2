//! Test fixture helpers for creating temporary test data.
//!
//! Provides a temporary base folder populated with generated source images,
//! plus throwaway config files. Everything is removed on drop.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;

/// A temporary base folder with source images.
///
/// # Example
///
/// ```ignore
/// let base = TestBase::new()
///     .with_image("photos/cat.png", 400, 200)
///     .with_image("photos/dog.jpg", 300, 300);
/// // base.path() is the adapter's base folder
/// ```
pub struct TestBase {
    /// The temporary directory acting as base folder.
    pub dir: TempDir,
}

impl Default for TestBase {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBase {
    /// Create an empty base folder.
    ///
    /// # Panics
    ///
    /// Panics if the temp directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a gradient image at `relative`; the format follows the extension.
    ///
    /// # Panics
    ///
    /// Panics if image creation fails.
    #[must_use]
    pub fn with_image(self, relative: &str, width: u32, height: u32) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create image directory");
        }
        gradient(width, height)
            .save(&path)
            .unwrap_or_else(|e| panic!("Failed to save image at {path:?}: {e}"));
        self
    }

    /// Add a PNG with a translucent alpha channel.
    ///
    /// # Panics
    ///
    /// Panics if image creation fails.
    #[must_use]
    pub fn with_rgba_image(self, relative: &str, width: u32, height: u32) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create image directory");
        }
        RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]))
            .save(&path)
            .unwrap_or_else(|e| panic!("Failed to save image at {path:?}: {e}"));
        self
    }

    /// Add a file with arbitrary contents.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    #[must_use]
    pub fn with_file(self, relative: &str, contents: &[u8]) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&path, contents).expect("Failed to write file");
        self
    }

    /// Get the path to the base folder.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Get the path as a string (useful for CLI arguments).
    ///
    /// # Panics
    ///
    /// Panics if the path is not valid UTF-8.
    #[must_use]
    pub fn path_str(&self) -> &str {
        self.dir.path().to_str().expect("Path is not valid UTF-8")
    }

    /// Absolute path of a file under the base folder.
    #[must_use]
    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

/// Deterministic RGB gradient, so resampled output is not uniform.
#[must_use]
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Temporary configuration file with automatic cleanup.
///
/// # Example
///
/// ```ignore
/// let config = TestConfig::toml("quality = 70\nvisibility = \"hidden\"");
/// // Use config.config_path in tests
/// ```
pub struct TestConfig {
    /// The temporary directory containing the config file.
    pub dir: TempDir,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl TestConfig {
    /// Create a temporary TOML configuration file.
    ///
    /// # Panics
    ///
    /// Panics if file creation fails.
    #[must_use]
    pub fn toml(content: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, content).expect("Failed to write config file");
        Self { dir, config_path }
    }

    /// Get the config path as a string.
    ///
    /// # Panics
    ///
    /// Panics if the path is not valid UTF-8.
    #[must_use]
    pub fn path_str(&self) -> &str {
        self.config_path.to_str().expect("Path is not valid UTF-8")
    }
}
