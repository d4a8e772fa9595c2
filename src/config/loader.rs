//! Loader for TOML cache configuration files.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::path::resolve_path;
use super::schema::CacheConfig;
use crate::error::{CacheError, Result};

/// File name looked up under the user config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config location: `<config_dir>/imgcache/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("imgcache").join(CONFIG_FILE_NAME))
}

/// Parse a config from TOML text and validate it.
///
/// A relative `base_folder` is left as written; [`load_config_file`]
/// anchors it to the file's directory.
pub fn parse_config(contents: &str) -> Result<CacheConfig> {
    let config: CacheConfig =
        toml::from_str(contents).map_err(|e| CacheError::ConfigParse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a config file.
pub fn load_config_file(path: &Path) -> Result<CacheConfig> {
    if !path.is_file() {
        return Err(CacheError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| CacheError::storage(path, e))?;
    let mut config = parse_config(&contents)?;

    let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.base_folder = resolve_path(&config.base_folder, config_dir)?;

    info!(
        path = %path.display(),
        base_folder = %config.base_folder.display(),
        "Loaded configuration"
    );
    Ok(config)
}

/// Load the effective config.
///
/// An explicit path must exist. Without one, the default location is used
/// when present, otherwise built-in defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<CacheConfig> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => load_config_file(&path),
        _ => {
            debug!("No config file found, using defaults");
            Ok(CacheConfig::default())
        }
    }
}
