//! Transform engine: runs one request from cache lookup to stored artifact.
//!
//! Each request walks `Unloaded -> Loaded -> Transformed -> Saved`. A hit
//! stops before `Loaded`, so no codec work happens for cached artifacts.
//!
//! # Example
//!
//! ```rust
//! use imgcache::cache::{ImageCache, Outcome};
//! use imgcache::codec::MockCodec;
//! use imgcache::config::CacheConfig;
//! use imgcache::storage::MemoryStorage;
//!
//! let storage = MemoryStorage::new("/srv/img");
//! storage.insert_file("photos/cat.jpg", MockCodec::fixture(400, 300));
//! let cache = ImageCache::new(storage, MockCodec::new(), CacheConfig::default()).unwrap();
//!
//! let first = cache.thumbnail("photos/cat.jpg", 100, 100).unwrap();
//! assert_eq!(first.outcome(), Outcome::Generated);
//! assert_eq!(first.public_path(), "photos/thumbnail/100/100/cat.jpg");
//!
//! let again = cache.thumbnail("photos/cat.jpg", 100, 100).unwrap();
//! assert!(again.was_cached());
//! ```

use std::path::Path;

use image::ImageFormat;
use tracing::{debug, instrument, trace, warn};

use super::artifact::{CachedArtifact, Outcome};
use super::key::{KeyPolicy, Method, TransformRequest, Visibility};
use super::path::PathResolver;
use super::source::SourceImage;
use super::store::CacheStore;
use crate::codec::{ImageCodec, RasterCodec, format_for_path};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::storage::{BoxedStorage, Storage, not_found_for, open_adapter};

/// Resize geometry for a cover-fit thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverFit {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
}

/// Scale `natural` so it covers `target`, then center the crop window.
///
/// Both natural dimensions must be positive.
pub fn cover_fit(natural: (u32, u32), target: (u32, u32)) -> CoverFit {
    let (nw, nh) = (f64::from(natural.0), f64::from(natural.1));
    let (w, h) = target;
    let scale = (f64::from(w) / nw).max(f64::from(h) / nh);

    // max() absorbs float error that would leave the scaled side short
    let scaled_width = ((nw * scale).ceil() as u32).max(w);
    let scaled_height = ((nh * scale).ceil() as u32).max(h);

    CoverFit {
        scaled_width,
        scaled_height,
        x_offset: (scaled_width - w) / 2,
        y_offset: (scaled_height - h) / 2,
    }
}

/// Per-request lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unloaded,
    Loaded,
    Transformed,
    Saved,
}

/// The image cache for one storage adapter.
///
/// Shareable across threads when the storage and codec are.
#[derive(Debug)]
pub struct ImageCache<S, C> {
    storage: S,
    codec: C,
    config: CacheConfig,
    policy: KeyPolicy,
    resolver: PathResolver,
}

impl ImageCache<BoxedStorage, RasterCodec> {
    /// Open the configured adapter with the `image`-crate codec.
    pub fn from_config(config: CacheConfig) -> Result<Self> {
        let storage = open_adapter(config.adapter, &config.base_folder)?;
        Self::new(storage, RasterCodec::new(), config)
    }
}

impl<S: Storage, C: ImageCodec> ImageCache<S, C> {
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the configuration does not validate.
    pub fn new(storage: S, codec: C, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let policy = KeyPolicy::from_config(&config);
        let resolver = PathResolver::new(storage.base_folder());
        Ok(Self {
            storage,
            codec,
            config,
            policy,
            resolver,
        })
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn codec(&self) -> &C {
        &self.codec
    }

    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub const fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    fn store(&self) -> CacheStore<'_, S> {
        CacheStore::new(&self.storage, self.config.dir_mode, self.config.file_mode)
    }

    /// Resolve a source image and start a request on it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the source is not a file under the base folder.
    pub fn open(&self, source: impl AsRef<Path>) -> Result<Transform<'_, S, C>> {
        let source = SourceImage::resolve(&self.storage, source.as_ref())?;
        Ok(Transform {
            cache: self,
            source,
            bytes: None,
            stage: Stage::Unloaded,
            overrides: Overrides::default(),
        })
    }

    /// Run `request` against `source`.
    pub fn process(
        &self,
        source: impl AsRef<Path>,
        request: &TransformRequest,
    ) -> Result<CachedArtifact> {
        self.open(source)?.apply(request.clone())
    }

    pub fn resize(&self, source: impl AsRef<Path>, width: u32, height: u32) -> Result<CachedArtifact> {
        self.open(source)?.resize(width, height)
    }

    pub fn crop(
        &self,
        source: impl AsRef<Path>,
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    ) -> Result<CachedArtifact> {
        self.open(source)?.crop(width, height, x, y)
    }

    pub fn scale(
        &self,
        source: impl AsRef<Path>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<CachedArtifact> {
        self.open(source)?.scale(width, height)
    }

    pub fn thumbnail(
        &self,
        source: impl AsRef<Path>,
        width: u32,
        height: u32,
    ) -> Result<CachedArtifact> {
        self.open(source)?.thumbnail(width, height)
    }

    /// Where `request` would be cached, without creating or decoding anything.
    ///
    /// The outcome is `Hit` if the artifact exists, otherwise `Missing`.
    pub fn locate(
        &self,
        source: impl AsRef<Path>,
        request: &TransformRequest,
    ) -> Result<CachedArtifact> {
        let source = SourceImage::resolve(&self.storage, source.as_ref())?;
        let key = self.policy.derive_cache_key(request)?;
        let bucket = self.resolver.bucket(&source, &key);
        let artifact = self.resolver.artifact(&source, &key);
        let outcome = if self.store().peek(&bucket, source.basename()) {
            Outcome::Hit
        } else {
            Outcome::Missing
        };
        Ok(CachedArtifact::cached(
            key,
            bucket,
            artifact,
            self.resolver.base_folder(),
            outcome,
        ))
    }
}

/// Request options set on a [`Transform`] before running an operation.
#[derive(Debug, Clone, Default)]
struct Overrides {
    name: Option<String>,
    prefix: Option<String>,
    quality: Option<u8>,
    allow_enlarge: Option<bool>,
    visibility: Option<Visibility>,
}

impl Overrides {
    /// Fill fields the request leaves unset.
    fn fill(&self, request: &mut TransformRequest) {
        if request.name.is_none() {
            request.name.clone_from(&self.name);
        }
        if request.prefix.is_none() {
            request.prefix.clone_from(&self.prefix);
        }
        request.quality = request.quality.or(self.quality);
        request.allow_enlarge = request.allow_enlarge.or(self.allow_enlarge);
        request.visibility = request.visibility.or(self.visibility);
    }
}

/// A request in progress against one source image.
pub struct Transform<'a, S, C> {
    cache: &'a ImageCache<S, C>,
    source: SourceImage,
    bytes: Option<Vec<u8>>,
    stage: Stage,
    overrides: Overrides,
}

impl<S: Storage, C: ImageCodec> Transform<'_, S, C> {
    /// Use an explicit bucket name instead of the method folders.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.overrides.name = Some(name.into());
        self
    }

    /// Add a leading folder to the key.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.overrides.prefix = Some(prefix.into());
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.overrides.quality = Some(quality);
        self
    }

    /// Allow upscaling past the natural dimensions.
    pub fn enlarge(mut self, allow: bool) -> Self {
        self.overrides.allow_enlarge = Some(allow);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.overrides.visibility = Some(visibility);
        self
    }

    pub const fn source(&self) -> &SourceImage {
        &self.source
    }

    pub const fn stage(&self) -> Stage {
        self.stage
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<CachedArtifact> {
        self.apply(TransformRequest::resize(width, height))
    }

    pub fn crop(&mut self, width: u32, height: u32, x: u32, y: u32) -> Result<CachedArtifact> {
        self.apply(TransformRequest::crop(width, height, x, y))
    }

    /// Proportional resize; at least one dimension is required.
    pub fn scale(&mut self, width: Option<u32>, height: Option<u32>) -> Result<CachedArtifact> {
        self.apply(TransformRequest::scale(width, height))
    }

    /// Cover-fit to exactly `width` x `height`.
    pub fn thumbnail(&mut self, width: u32, height: u32) -> Result<CachedArtifact> {
        self.apply(TransformRequest::thumbnail(width, height))
    }

    /// Run an arbitrary request; fields it leaves unset take the builder
    /// values, then the adapter config.
    #[instrument(
        skip_all,
        fields(source = %self.source.path().display(), method = %request.method)
    )]
    pub fn apply(&mut self, mut request: TransformRequest) -> Result<CachedArtifact> {
        self.overrides.fill(&mut request);
        self.stage = Stage::Unloaded;

        let cache = self.cache;
        let key = cache.policy.derive_cache_key(&request)?;
        let format = format_for_path(self.source.path())?;
        let quality = request.quality.unwrap_or(cache.config.quality);
        let base = cache.resolver.base_folder();
        let bucket = cache.resolver.bucket(&self.source, &key);
        let artifact = cache.resolver.artifact(&self.source, &key);
        let basename = self.source.basename().to_string();
        let store = cache.store();

        debug!(key = %key, "Resolved cache location");

        if store.peek(&bucket, &basename) {
            debug!(artifact = %artifact.display(), "Cache hit");
            return Ok(CachedArtifact::cached(key, bucket, artifact, base, Outcome::Hit));
        }

        // Header only; the pixel ceiling applies before anything is decoded
        let natural = self.natural_dimensions()?;
        let allow_enlarge = request.allow_enlarge.unwrap_or(cache.config.allow_enlarge);
        if !allow_enlarge && would_enlarge(&request, natural) {
            warn!(
                width = ?request.width,
                height = ?request.height,
                ?natural,
                "Refusing to enlarge, serving original"
            );
            return Ok(CachedArtifact::original(
                self.source.directory(),
                self.source.path(),
                base,
            ));
        }

        if store.has_cached(&bucket, &basename)? {
            // Another writer finished between peek and bucket creation
            debug!(artifact = %artifact.display(), "Cache hit");
            return Ok(CachedArtifact::cached(key, bucket, artifact, base, Outcome::Hit));
        }

        let image = self.load_image()?;
        let image = self.transform(image, &request)?;
        let (width, height) = cache.codec.dimensions(&image);
        self.save(&image, &bucket, &basename, format, quality)?;

        Ok(CachedArtifact::cached(key, bucket, artifact, base, Outcome::Generated)
            .with_dimensions(width, height))
    }

    fn read_source(&mut self) -> Result<&[u8]> {
        if self.bytes.is_none() {
            let bytes = self
                .cache
                .storage
                .read(self.source.path())
                .map_err(|e| not_found_for(e, self.source.path()))?;
            self.bytes = Some(bytes);
        }
        Ok(self.bytes.as_deref().unwrap_or_default())
    }

    fn check_weight(&self, width: u32, height: u32) -> Result<()> {
        let config = &self.cache.config;
        if config.exceeds_max_pixels(width, height) {
            return Err(CacheError::TooHeavy {
                width,
                height,
                max_pixels: config.max_pixels,
            });
        }
        Ok(())
    }

    /// Natural dimensions, from the header if nothing is decoded yet.
    fn natural_dimensions(&mut self) -> Result<(u32, u32)> {
        if let Some(dimensions) = self.source.dimensions() {
            return Ok(dimensions);
        }
        let cache = self.cache;
        let (width, height) = cache.codec.probe(self.read_source()?)?;
        self.check_weight(width, height)?;
        self.source.set_dimensions(width, height);
        Ok((width, height))
    }

    /// Unloaded -> Loaded.
    fn load_image(&mut self) -> Result<C::Image> {
        self.natural_dimensions()?;
        let cache = self.cache;
        let image = cache.codec.decode(self.read_source()?)?;
        let (width, height) = cache.codec.dimensions(&image);
        self.check_weight(width, height)?;
        if width == 0 || height == 0 {
            return Err(CacheError::ImageProcessing(format!(
                "{} decoded to an empty image",
                self.source.path().display()
            )));
        }
        self.source.set_dimensions(width, height);
        self.stage = Stage::Loaded;
        trace!(width, height, "Loaded source image");
        Ok(image)
    }

    /// Loaded -> Transformed.
    fn transform(&mut self, image: C::Image, request: &TransformRequest) -> Result<C::Image> {
        let cache = self.cache;
        let codec = &cache.codec;
        let image = match request.method {
            Method::Resized => {
                let (w, h) = request.exact_dimensions()?;
                codec.resize(image, w, h)?
            }
            Method::Cropped => {
                let (w, h) = request.exact_dimensions()?;
                let (x, y) = request.offset;
                codec.crop(image, w, h, x, y)?
            }
            Method::Scaled => match (request.width, request.height) {
                (Some(w), Some(h)) => codec.resize(image, w, h)?,
                (Some(w), None) => codec.widen(image, w)?,
                (None, Some(h)) => codec.heighten(image, h)?,
                (None, None) => {
                    return Err(CacheError::InvalidArgument(
                        "at least one dimension required".to_string(),
                    ));
                }
            },
            Method::Thumbnail => {
                let (w, h) = request.exact_dimensions()?;
                let fit = cover_fit(codec.dimensions(&image), (w, h));
                trace!(?fit, "Computed cover fit");
                let image = codec.resize(image, fit.scaled_width, fit.scaled_height)?;
                codec.crop(image, w, h, fit.x_offset, fit.y_offset)?
            }
        };
        self.stage = Stage::Transformed;
        Ok(image)
    }

    /// Transformed -> Saved.
    fn save(
        &mut self,
        image: &C::Image,
        bucket: &Path,
        basename: &str,
        format: ImageFormat,
        quality: u8,
    ) -> Result<()> {
        let bytes = self.cache.codec.encode(image, format, quality)?;
        self.cache.store().persist(bucket, basename, &bytes)?;
        self.stage = Stage::Saved;
        Ok(())
    }
}

fn would_enlarge(request: &TransformRequest, (nw, nh): (u32, u32)) -> bool {
    request.width.is_some_and(|w| w > nw) || request.height.is_some_and(|h| h > nh)
}
