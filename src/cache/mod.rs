//! The image cache: key policy, path resolution, hit gate and transforms.

mod artifact;
mod engine;
mod key;
mod path;
mod source;
mod store;

pub use artifact::{CachedArtifact, Outcome};
pub use engine::{CoverFit, ImageCache, Stage, Transform, cover_fit};
pub use key::{CacheKey, KeyPolicy, Method, TransformRequest, Visibility};
pub use path::{PathResolver, resolve_cache_path, to_public};
pub use source::SourceImage;
pub use store::CacheStore;
