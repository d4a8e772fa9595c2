//! Cache key derivation.
//!
//! A key is the bucket folder path an artifact lives under, relative to
//! the source image's directory:
//!
//! ```text
//! [<hidden-segment>/][<prefix>/](<override> | <method>/<width>/<height>[/<x>-<y>])
//! ```
//!
//! Identical requests always yield identical keys. Prefixes and overrides
//! may not contain a method folder or the hidden segment anywhere, so a
//! method key always holds exactly one method folder, an override key holds
//! none, and only hidden keys start with the hidden segment. No override
//! or prefix can alias a method key.

use std::fmt;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{CacheConfig, DEFAULT_HIDDEN_SEGMENT, validate_quality};
use crate::error::{CacheError, Result};
use crate::naming::{Locale, slugify_path};

/// Transform method, also the leading folder of method keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Exact resample, aspect ratio ignored.
    Resized,
    /// Region cut at an offset.
    Cropped,
    /// Proportional resize on one or both axes.
    Scaled,
    /// Cover-fit resize plus center crop.
    Thumbnail,
}

impl Method {
    pub const ALL: [Self; 4] = [Self::Resized, Self::Cropped, Self::Scaled, Self::Thumbnail];

    /// Folder name used in cache keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resized => "resized",
            Self::Cropped => "cropped",
            Self::Scaled => "scaled",
            Self::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where cache buckets are placed relative to the source directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Buckets are siblings of the published files.
    #[default]
    Visible,
    /// Buckets live under the dot-prefixed hidden segment.
    Hidden,
}

/// One transform request: method, dimensions and per-request overrides.
///
/// Unset overrides fall back to the adapter's [`CacheConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub method: Method,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Top-left corner for crops; ignored by other methods.
    pub offset: (u32, u32),
    pub quality: Option<u8>,
    /// Explicit bucket name, replacing the method folders.
    pub name: Option<String>,
    /// Extra leading folder.
    pub prefix: Option<String>,
    pub allow_enlarge: Option<bool>,
    pub visibility: Option<Visibility>,
}

impl TransformRequest {
    fn new(method: Method, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            method,
            width,
            height,
            offset: (0, 0),
            quality: None,
            name: None,
            prefix: None,
            allow_enlarge: None,
            visibility: None,
        }
    }

    pub fn resize(width: u32, height: u32) -> Self {
        Self::new(Method::Resized, Some(width), Some(height))
    }

    pub fn crop(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self {
            offset: (x, y),
            ..Self::new(Method::Cropped, Some(width), Some(height))
        }
    }

    pub fn scale(width: Option<u32>, height: Option<u32>) -> Self {
        Self::new(Method::Scaled, width, height)
    }

    pub fn thumbnail(width: u32, height: u32) -> Self {
        Self::new(Method::Thumbnail, Some(width), Some(height))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_enlarge(mut self, allow: bool) -> Self {
        self.allow_enlarge = Some(allow);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Both dimensions, for methods that require them.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if either dimension is unset.
    pub fn exact_dimensions(&self) -> Result<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Ok((w, h)),
            _ => Err(CacheError::InvalidArgument(format!(
                "{} requires both width and height",
                self.method
            ))),
        }
    }

    /// Check dimensions and quality before any storage is touched.
    pub fn validate(&self) -> Result<()> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(CacheError::InvalidArgument(
                "dimensions must be greater than zero".to_string(),
            ));
        }

        match self.method {
            Method::Scaled => {
                if self.width.is_none() && self.height.is_none() {
                    return Err(CacheError::InvalidArgument(
                        "at least one dimension required".to_string(),
                    ));
                }
            }
            Method::Resized | Method::Cropped | Method::Thumbnail => {
                self.exact_dimensions()?;
            }
        }

        if let Some(quality) = self.quality {
            validate_quality(quality)?;
        }
        Ok(())
    }
}

/// A derived bucket path, `/`-separated and relative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Naming rules shared by every request on one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPolicy {
    pub visibility: Visibility,
    pub hidden_segment: String,
    pub slugify_names: bool,
    pub locale: Locale,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            visibility: Visibility::default(),
            hidden_segment: DEFAULT_HIDDEN_SEGMENT.to_string(),
            slugify_names: true,
            locale: Locale::default(),
        }
    }
}

impl KeyPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            visibility: config.visibility,
            hidden_segment: config.hidden_segment.clone(),
            slugify_names: config.slugify_names,
            locale: config.locale.clone(),
        }
    }

    /// Derive the bucket key for `request`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for invalid dimensions, or for a name or
    /// prefix that is empty, relative, or shadows a method folder.
    pub fn derive_cache_key(&self, request: &TransformRequest) -> Result<CacheKey> {
        request.validate()?;

        let mut segments: Vec<String> = Vec::with_capacity(3);

        if request.visibility.unwrap_or(self.visibility) == Visibility::Hidden {
            segments.push(self.hidden_segment.clone());
        }

        if let Some(prefix) = &request.prefix {
            segments.push(self.normalize_name(prefix, "prefix")?);
        }

        match &request.name {
            Some(name) => segments.push(self.normalize_name(name, "naming override")?),
            None => segments.push(method_segments(request)?),
        }

        let key = CacheKey(segments.join("/"));
        trace!(key = %key, method = %request.method, "Derived cache key");
        Ok(key)
    }

    fn normalize_name(&self, raw: &str, what: &str) -> Result<String> {
        let name = if self.slugify_names {
            slugify_path(raw, &self.locale)
        } else {
            raw.trim_matches('/').to_string()
        };

        if name.is_empty() {
            return Err(CacheError::InvalidArgument(format!("{what} '{raw}' is empty")));
        }
        if name
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(CacheError::InvalidArgument(format!(
                "{what} '{raw}' contains empty or relative segments"
            )));
        }
        if let Some(reserved) = name.split('/').find(|segment| self.is_reserved(segment)) {
            return Err(CacheError::InvalidArgument(format!(
                "{what} '{name}' uses the reserved folder name '{reserved}'"
            )));
        }
        Ok(name)
    }

    /// Method folders and the hidden segment belong to derived keys only.
    fn is_reserved(&self, segment: &str) -> bool {
        segment == self.hidden_segment || Method::ALL.iter().any(|m| m.as_str() == segment)
    }
}

fn dimension(value: Option<u32>) -> String {
    value.map_or_else(|| "auto".to_string(), |v| v.to_string())
}

fn method_segments(request: &TransformRequest) -> Result<String> {
    let method = request.method.as_str();
    Ok(match request.method {
        Method::Scaled => format!(
            "{method}/{}/{}",
            dimension(request.width),
            dimension(request.height)
        ),
        Method::Cropped => {
            let (w, h) = request.exact_dimensions()?;
            let (x, y) = request.offset;
            format!("{method}/{w}/{h}/{x}-{y}")
        }
        Method::Resized | Method::Thumbnail => {
            let (w, h) = request.exact_dimensions()?;
            format!("{method}/{w}/{h}")
        }
    })
}
