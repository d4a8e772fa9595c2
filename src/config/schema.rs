//! Configuration schema for the image cache.
//!
//! Every field has a default, so an empty TOML file is a valid config:
//!
//! ```toml
//! base_folder = "/srv/www/images"
//! adapter = "local"
//! visibility = "hidden"
//! hidden_segment = ".cache"
//! quality = 85
//! allow_enlarge = false
//! max_pixels = 100_000_000
//! locale = "de_DE"
//! slugify_names = true
//! file_mode = 0o644
//! dir_mode = 0o755
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::Visibility;
use crate::error::{CacheError, Result};
use crate::naming::Locale;
use crate::storage::AdapterKind;

/// Default encode quality, 1-100.
pub const DEFAULT_QUALITY: u8 = 90;

/// Default dot-prefixed folder holding hidden cache buckets.
pub const DEFAULT_HIDDEN_SEGMENT: &str = ".cache";

/// Default decoded-pixel ceiling (100 megapixels).
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// Permission bits applied to written artifacts.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Permission bits applied to created bucket directories.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Adapter-wide cache configuration.
///
/// Request-level options (quality, enlarge, visibility) fall back to the
/// values here when a request leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Root folder of the storage adapter.
    pub base_folder: PathBuf,
    /// Storage backend serving `base_folder`.
    pub adapter: AdapterKind,
    /// Whether cache buckets live under `hidden_segment` by default.
    pub visibility: Visibility,
    /// Dot-prefixed folder name used for hidden buckets.
    pub hidden_segment: String,
    /// Default encode quality.
    pub quality: u8,
    /// Default enlarge flag.
    pub allow_enlarge: bool,
    /// Maximum decoded pixel area; 0 disables the check.
    pub max_pixels: u64,
    /// Locale for slugging naming overrides.
    pub locale: Locale,
    /// Slug naming overrides and prefixes into folder-safe names.
    pub slugify_names: bool,
    /// Artifact permission bits.
    pub file_mode: u32,
    /// Bucket directory permission bits.
    pub dir_mode: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_folder: PathBuf::from("."),
            adapter: AdapterKind::default(),
            visibility: Visibility::default(),
            hidden_segment: DEFAULT_HIDDEN_SEGMENT.to_string(),
            quality: DEFAULT_QUALITY,
            allow_enlarge: false,
            max_pixels: DEFAULT_MAX_PIXELS,
            locale: Locale::default(),
            slugify_names: true,
            file_mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

impl CacheConfig {
    /// Config rooted at `base_folder`, everything else default.
    pub fn with_base(base_folder: impl Into<PathBuf>) -> Self {
        Self {
            base_folder: base_folder.into(),
            ..Self::default()
        }
    }

    /// Check value ranges and the hidden segment shape.
    pub fn validate(&self) -> Result<()> {
        validate_quality(self.quality)?;

        let segment = self.hidden_segment.as_str();
        if segment.len() < 2 || !segment.starts_with('.') {
            return Err(CacheError::ConfigInvalid(format!(
                "hidden_segment must be a dot-prefixed folder name, got '{segment}'"
            )));
        }
        if segment.contains(['/', '\\']) || segment == ".." {
            return Err(CacheError::ConfigInvalid(format!(
                "hidden_segment must be a single folder name, got '{segment}'"
            )));
        }

        if self.file_mode > 0o7777 || self.dir_mode > 0o7777 {
            return Err(CacheError::ConfigInvalid(
                "file_mode and dir_mode must be permission bits (<= 0o7777)".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether a decoded area of `width` x `height` is over the ceiling.
    pub fn exceeds_max_pixels(&self, width: u32, height: u32) -> bool {
        self.max_pixels != 0 && u64::from(width) * u64::from(height) > self.max_pixels
    }
}

/// Quality must be 1-100.
pub fn validate_quality(quality: u8) -> Result<()> {
    if (1..=100).contains(&quality) {
        Ok(())
    } else {
        Err(CacheError::InvalidArgument(format!(
            "quality must be between 1 and 100, got {quality}"
        )))
    }
}
