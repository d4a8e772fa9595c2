//! imgcache library - on-demand image transforms with deterministic cache paths.
//!
//! This library exposes the core of the `imgcache` CLI for embedding and
//! for tests.
//!
//! # Modules
//!
//! - `cache`: Cache keys, path resolution, the hit gate and the transform engine
//! - `codec`: Image codec abstraction (`image` crate backend plus a recording mock)
//! - `storage`: Storage adapters (local filesystem, in-memory)
//! - `config`: Configuration file handling
//! - `naming`: Locale-aware slugs for naming overrides
//! - `batch`: Directory scanning for cache warming
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod batch;
pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod naming;
pub mod storage;
