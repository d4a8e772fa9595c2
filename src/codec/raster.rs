//! Codec backed by the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageReader};
use tracing::trace;

use super::ImageCodec;
use crate::error::{CacheError, Result};

/// Decodes, resamples and encodes with the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    filter: FilterType,
}

impl RasterCodec {
    /// Codec using Lanczos3 resampling.
    pub const fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Codec using a specific resampling filter.
    pub const fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn map_image_error(err: ImageError) -> CacheError {
    match err {
        ImageError::Unsupported(e) => CacheError::UnsupportedFormat(e.to_string()),
        other => CacheError::ImageProcessing(other.to_string()),
    }
}

impl ImageCodec for RasterCodec {
    type Image = DynamicImage;

    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32)> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CacheError::ImageProcessing(e.to_string()))?
            .into_dimensions()
            .map_err(map_image_error)
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        let image = image::load_from_memory(bytes).map_err(map_image_error)?;
        trace!(width = image.width(), height = image.height(), "Decoded image");
        Ok(image)
    }

    fn dimensions(&self, image: &DynamicImage) -> (u32, u32) {
        image.dimensions()
    }

    fn resize(&self, image: DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
        if width == 0 || height == 0 {
            return Err(CacheError::InvalidArgument(format!(
                "cannot resize to {width}x{height}"
            )));
        }
        Ok(image.resize_exact(width, height, self.filter))
    }

    fn crop(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    ) -> Result<DynamicImage> {
        // crop_imm clamps the region to the image bounds
        Ok(image.crop_imm(x, y, width, height))
    }

    fn encode(&self, image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                // JPEG has no alpha channel
                DynamicImage::ImageRgb8(image.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(map_image_error)?;
            }
            other => {
                image
                    .write_to(&mut Cursor::new(&mut buf), other)
                    .map_err(map_image_error)?;
            }
        }
        trace!(?format, quality, bytes = buf.len(), "Encoded image");
        Ok(buf)
    }
}
