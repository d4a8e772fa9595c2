//! Mock codec implementation for unit testing.
//!
//! This module provides a codec that never touches pixels: images are
//! just dimensions, and every call is recorded so tests can assert how
//! much codec work a request caused.
//!
//! # Example
//!
//! ```rust
//! use imgcache::codec::{ImageCodec, MockCodec, MockImage, Operation};
//!
//! let codec = MockCodec::new();
//! let image = codec.decode(&MockCodec::fixture(200, 100)).unwrap();
//! let image = codec.resize(image, 100, 50).unwrap();
//!
//! assert_eq!(image, MockImage::new(100, 50));
//! codec.assert_operations(&[
//!     Operation::Decode,
//!     Operation::Resize { width: 100, height: 50 },
//! ]);
//! ```

use std::sync::Mutex;

use image::ImageFormat;
use tracing::trace;

use super::ImageCodec;
use crate::error::{CacheError, Result};

const MAGIC: &str = "MOCK";

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Probe,
    Decode,
    Resize {
        width: u32,
        height: u32,
    },
    Crop {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    },
    Encode {
        format: ImageFormat,
        quality: u8,
    },
}

/// A "decoded" image: dimensions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockImage {
    pub width: u32,
    pub height: u32,
}

impl MockImage {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Codec that records every call and encodes images as `MOCK<w>x<h>`.
#[derive(Debug, Default)]
pub struct MockCodec {
    operations: Mutex<Vec<Operation>>,
}

impl MockCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes that decode to a `width` x `height` mock image.
    pub fn fixture(width: u32, height: u32) -> Vec<u8> {
        format!("{MAGIC}{width}x{height}").into_bytes()
    }

    /// Parse bytes produced by [`MockCodec::fixture`] or `encode`.
    pub fn parse(bytes: &[u8]) -> Option<MockImage> {
        let text = std::str::from_utf8(bytes).ok()?;
        let (w, h) = text.strip_prefix(MAGIC)?.split_once('x')?;
        Some(MockImage::new(w.parse().ok()?, h.parse().ok()?))
    }

    fn record(&self, op: Operation) {
        trace!(?op, "Mock codec operation");
        self.operations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(op);
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<Operation> {
        self.operations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded operations.
    pub fn operation_count(&self) -> usize {
        self.operations().len()
    }

    /// Forget recorded operations.
    pub fn clear(&self) {
        self.operations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// Assert the exact operation sequence.
    ///
    /// # Panics
    ///
    /// Panics if the recorded operations differ.
    pub fn assert_operations(&self, expected: &[Operation]) {
        assert_eq!(self.operations(), expected, "codec operations differ");
    }
}

impl ImageCodec for MockCodec {
    type Image = MockImage;

    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32)> {
        self.record(Operation::Probe);
        Self::parse(bytes)
            .map(|img| (img.width, img.height))
            .ok_or_else(|| CacheError::ImageProcessing("not a mock image".to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<MockImage> {
        self.record(Operation::Decode);
        Self::parse(bytes).ok_or_else(|| CacheError::ImageProcessing("not a mock image".to_string()))
    }

    fn dimensions(&self, image: &MockImage) -> (u32, u32) {
        (image.width, image.height)
    }

    fn resize(&self, _image: MockImage, width: u32, height: u32) -> Result<MockImage> {
        self.record(Operation::Resize { width, height });
        Ok(MockImage::new(width, height))
    }

    fn crop(&self, _image: MockImage, width: u32, height: u32, x: u32, y: u32) -> Result<MockImage> {
        self.record(Operation::Crop {
            width,
            height,
            x,
            y,
        });
        Ok(MockImage::new(width, height))
    }

    fn encode(&self, image: &MockImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
        self.record(Operation::Encode { format, quality });
        Ok(Self::fixture(image.width, image.height))
    }
}
