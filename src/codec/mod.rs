//! Image codec abstraction.
//!
//! The cache never touches pixels itself. Decoding, resampling, cropping
//! and encoding all go through an [`ImageCodec`], so the transform engine
//! can be exercised against the recording mock in [`mock`] without real
//! image data.

pub mod mock;
mod raster;

pub use mock::{MockCodec, MockImage, Operation};
pub use raster::RasterCodec;

use std::path::Path;

use image::ImageFormat;

use crate::config::validate_image_extension;
use crate::error::{CacheError, Result};

/// Codec operations the transform engine relies on.
pub trait ImageCodec: Send + Sync {
    /// Decoded in-memory working image.
    type Image: Send;

    /// Read natural dimensions from the header without decoding pixels.
    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32)>;

    /// Decode a whole image.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image>;

    /// Current (width, height) of a working image.
    fn dimensions(&self, image: &Self::Image) -> (u32, u32);

    /// Resample to exactly `width` x `height`.
    fn resize(&self, image: Self::Image, width: u32, height: u32) -> Result<Self::Image>;

    /// Cut a `width` x `height` region whose top-left corner is at (x, y).
    ///
    /// Out-of-bounds regions are handled however the codec handles them.
    fn crop(&self, image: Self::Image, width: u32, height: u32, x: u32, y: u32)
    -> Result<Self::Image>;

    /// Encode to `format`; `quality` (1-100) applies to lossy formats.
    fn encode(&self, image: &Self::Image, format: ImageFormat, quality: u8) -> Result<Vec<u8>>;

    /// Resize to `width`, keeping the aspect ratio.
    fn widen(&self, image: Self::Image, width: u32) -> Result<Self::Image> {
        let (w, h) = self.dimensions(&image);
        let height = proportional(h, w, width);
        self.resize(image, width, height)
    }

    /// Resize to `height`, keeping the aspect ratio.
    fn heighten(&self, image: Self::Image, height: u32) -> Result<Self::Image> {
        let (w, h) = self.dimensions(&image);
        let width = proportional(w, h, height);
        self.resize(image, width, height)
    }
}

/// Scale `other` by `target / fixed`, rounded, never below one pixel.
pub fn proportional(other: u32, fixed: u32, target: u32) -> u32 {
    if fixed == 0 {
        return target.max(1);
    }
    let scaled = (f64::from(other) * f64::from(target) / f64::from(fixed)).round();
    (scaled as u32).max(1)
}

/// Output format for an artifact, chosen by the source extension.
///
/// Only extensions in [`SUPPORTED_EXTENSIONS`](crate::config::SUPPORTED_EXTENSIONS)
/// are accepted, even where `image` could decode more.
pub fn format_for_path(path: &Path) -> Result<ImageFormat> {
    validate_image_extension(path)?;
    ImageFormat::from_path(path).map_err(|_| {
        CacheError::UnsupportedFormat(
            path.extension()
                .map_or_else(|| path.display().to_string(), |e| e.to_string_lossy().into_owned()),
        )
    })
}
