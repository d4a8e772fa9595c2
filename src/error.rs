//! Error types for image cache operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for cache and transform operations.
#[derive(Error, Debug)]
pub enum CacheError {
    // Source errors
    #[error("Source image not found: {path}")]
    NotFound { path: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Image too heavy: {width}x{height} exceeds the {max_pixels} pixel ceiling")]
    TooHeavy {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    // Codec errors
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    // Storage errors
    #[error("Storage operation failed on {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl CacheError {
    /// Build a storage error bound to the path it concerns.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidArgument(_)
                | Self::TooHeavy { .. }
                | Self::UnsupportedFormat(_)
                | Self::ConfigNotFound { .. }
                | Self::ConfigInvalid(_)
        )
    }

    /// Returns true for failures a caller may retry once (e.g. a directory
    /// creation race on the storage backend).
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_))
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => {
                Some("Pass a path relative to --base, or an absolute path inside it")
            }
            Self::InvalidArgument(_) => Some("Check the transform dimensions and naming override"),
            Self::TooHeavy { .. } => Some("Raise max_pixels in the config, or set it to 0"),
            Self::UnsupportedFormat(_) => Some("Use png, jpg, gif, bmp, webp or tiff sources"),
            Self::ConfigNotFound { .. } => Some("Create the file or drop --config"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using CacheError.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CacheError::Other(format!("{}: {e}", f().into())))
    }
}
