//! Configuration module for the image cache.
//!
//! Handles the TOML config schema, loading it from disk, and resolving
//! the paths it contains.

mod loader;
mod path;
mod schema;

pub use loader::{CONFIG_FILE_NAME, default_config_path, load_config, load_config_file, parse_config};
pub use path::{
    SUPPORTED_EXTENSIONS, home_dir, is_supported_image, resolve_path, validate_image_extension,
};
pub use schema::{
    CacheConfig, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, DEFAULT_HIDDEN_SEGMENT, DEFAULT_MAX_PIXELS,
    DEFAULT_QUALITY, validate_quality,
};
