//! Batch operations: warming the cache for a folder of images.

mod scanner;

pub use scanner::{ImageEntry, ScanError, ScanResult, scan_images};
