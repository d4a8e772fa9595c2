//! Request lifecycle against a real base folder.

use std::fs;
use std::path::Path;

use imgcache::cache::{ImageCache, Outcome, TransformRequest, Visibility};
use imgcache::codec::RasterCodec;
use imgcache::config::{CacheConfig, load_config_file};
use imgcache::error::CacheError;
use imgcache::storage::{BoxedStorage, LocalStorage};

use crate::common::fixtures::{TestBase, TestConfig};
use crate::common::init_test_logging;

fn open(base: &TestBase) -> ImageCache<BoxedStorage, RasterCodec> {
    init_test_logging();
    ImageCache::from_config(CacheConfig::with_base(base.path())).unwrap()
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn thumbnail_is_generated_once_then_served_from_cache() {
    let base = TestBase::new().with_image("photos/cat.png", 400, 200);
    let cache = open(&base);

    let first = cache.thumbnail("photos/cat.png", 100, 100).unwrap();
    assert_eq!(first.outcome(), Outcome::Generated);
    assert_eq!(first.public_path(), "photos/thumbnail/100/100/cat.png");

    let artifact = first.absolute_artifact_path();
    assert_eq!(image::image_dimensions(&artifact).unwrap(), (100, 100));
    let written = fs::metadata(&artifact).unwrap().modified().unwrap();

    let second = cache.thumbnail("photos/cat.png", 100, 100).unwrap();
    assert_eq!(second.outcome(), Outcome::Hit);
    assert_eq!(second.absolute_artifact_path(), artifact);
    assert_eq!(fs::metadata(&artifact).unwrap().modified().unwrap(), written);
}

#[test]
fn scale_by_width_keeps_aspect_ratio() {
    let base = TestBase::new().with_image("wide.png", 200, 100);
    let cache = open(&base);

    let artifact = cache.scale("wide.png", Some(100), None).unwrap();
    assert_eq!(artifact.public_path(), "scaled/100/auto/wide.png");
    assert_eq!(
        image::image_dimensions(artifact.absolute_artifact_path()).unwrap(),
        (100, 50)
    );
}

#[test]
fn scale_by_height_keeps_aspect_ratio() {
    let base = TestBase::new().with_image("tall.png", 90, 300);
    let cache = open(&base);

    let artifact = cache.scale("tall.png", None, Some(100)).unwrap();
    assert_eq!(artifact.public_path(), "scaled/auto/100/tall.png");
    assert_eq!(
        image::image_dimensions(artifact.absolute_artifact_path()).unwrap(),
        (30, 100)
    );
}

#[test]
fn resize_ignores_aspect_ratio() {
    let base = TestBase::new().with_image("banner.png", 300, 100);
    let cache = open(&base);

    let artifact = cache.resize("banner.png", 50, 50).unwrap();
    assert_eq!(
        image::image_dimensions(artifact.absolute_artifact_path()).unwrap(),
        (50, 50)
    );
}

#[test]
fn crop_cuts_region_under_offset_key() {
    let base = TestBase::new().with_image("cat.png", 100, 80);
    let cache = open(&base);

    let artifact = cache.crop("cat.png", 40, 30, 10, 20).unwrap();
    assert_eq!(artifact.public_path(), "cropped/40/30/10-20/cat.png");
    assert_eq!(
        image::image_dimensions(artifact.absolute_artifact_path()).unwrap(),
        (40, 30)
    );

    let other = cache.crop("cat.png", 40, 30, 0, 0).unwrap();
    assert_eq!(other.outcome(), Outcome::Generated);
}

#[test]
fn hidden_visibility_nests_buckets_under_dot_folder() {
    let base = TestBase::new().with_image("photos/cat.png", 120, 120);
    let config = CacheConfig {
        visibility: Visibility::Hidden,
        ..CacheConfig::with_base(base.path())
    };
    let cache = ImageCache::from_config(config).unwrap();

    let artifact = cache.thumbnail("photos/cat.png", 32, 32).unwrap();
    assert_eq!(artifact.public_path(), "photos/.cache/thumbnail/32/32/cat.png");
    assert!(base.join("photos/.cache/thumbnail/32/32/cat.png").is_file());
    assert_eq!(entries(&base.join("photos")), [".cache", "cat.png"]);
}

#[test]
fn naming_override_and_prefix_shape_the_bucket() {
    let base = TestBase::new().with_image("cat.png", 120, 120);
    let cache = open(&base);

    let request = TransformRequest::thumbnail(48, 48)
        .with_prefix("Shop")
        .with_name("Product Card");
    let artifact = cache.process("cat.png", &request).unwrap();
    assert_eq!(artifact.public_path(), "shop/product-card/cat.png");
}

#[test]
fn enlarge_guard_serves_original_without_touching_storage() {
    let base = TestBase::new().with_image("small.png", 100, 100);
    let cache = open(&base);

    let artifact = cache.resize("small.png", 5000, 5000).unwrap();
    assert_eq!(artifact.outcome(), Outcome::Original);
    assert_eq!(artifact.public_path(), "small.png");
    assert_eq!(artifact.absolute_artifact_path(), base.join("small.png").canonicalize().unwrap());
    assert_eq!(entries(base.path()), ["small.png"]);
}

#[test]
fn enlarge_allowed_upscales() {
    let base = TestBase::new().with_image("small.png", 20, 10);
    let cache = open(&base);

    let request = TransformRequest::scale(Some(80), None).with_enlarge(true);
    let artifact = cache.process("small.png", &request).unwrap();
    assert_eq!(artifact.outcome(), Outcome::Generated);
    assert_eq!(
        image::image_dimensions(artifact.absolute_artifact_path()).unwrap(),
        (80, 40)
    );
}

#[test]
fn invalid_request_leaves_base_folder_untouched() {
    let base = TestBase::new().with_image("cat.png", 50, 50);
    let cache = open(&base);

    let err = cache.scale("cat.png", None, None).unwrap_err();
    assert!(matches!(err, CacheError::InvalidArgument(_)));
    let err = cache.resize("cat.png", 0, 10).unwrap_err();
    assert!(matches!(err, CacheError::InvalidArgument(_)));
    assert_eq!(entries(base.path()), ["cat.png"]);
}

#[test]
fn missing_and_escaping_sources_are_not_found() {
    let base = TestBase::new().with_image("cat.png", 50, 50);
    let outside = TestBase::new().with_image("secret.png", 50, 50);
    let missing_outside = outside.join("ghost.png");
    let cache = open(&base);

    for source in [
        Path::new("dog.png"),
        Path::new("../secret.png"),
        missing_outside.as_path(),
    ] {
        assert!(
            matches!(cache.resize(source, 10, 10), Err(CacheError::NotFound { .. })),
            "{} should be NotFound",
            source.display()
        );
    }
}

#[test]
fn absolute_source_outside_base_is_cached_beside_it() {
    let base = TestBase::new().with_image("cat.png", 50, 50);
    let outside = TestBase::new().with_image("uploads/dog.png", 200, 100);
    let cache = open(&base);

    let source = outside.join("uploads/dog.png");
    let artifact = cache.scale(&source, Some(50), None).unwrap();
    assert_eq!(artifact.outcome(), Outcome::Generated);

    let expected = outside
        .join("uploads")
        .canonicalize()
        .unwrap()
        .join("scaled/50/auto/dog.png");
    assert_eq!(artifact.absolute_artifact_path(), expected);
    assert_eq!(image::image_dimensions(&expected).unwrap(), (50, 25));
    assert_eq!(entries(base.path()), ["cat.png"]);

    let again = cache.scale(&source, Some(50), None).unwrap();
    assert_eq!(again.outcome(), Outcome::Hit);
}

#[test]
fn corrupt_source_fails_without_artifact() {
    let base = TestBase::new().with_file("broken.png", b"not really a png");
    let cache = open(&base);

    assert!(cache.thumbnail("broken.png", 10, 10).is_err());
    assert!(!base.join("thumbnail/10/10/broken.png").exists());
}

#[test]
fn jpeg_quality_changes_encoded_size() {
    let base = TestBase::new().with_image("photo.jpg", 256, 256);
    let cache = open(&base);

    let low = cache
        .process("photo.jpg", &TransformRequest::resize(200, 200).with_prefix("low").with_quality(10))
        .unwrap();
    let high = cache
        .process("photo.jpg", &TransformRequest::resize(200, 200).with_prefix("high").with_quality(95))
        .unwrap();

    let low_len = fs::metadata(low.absolute_artifact_path()).unwrap().len();
    let high_len = fs::metadata(high.absolute_artifact_path()).unwrap().len();
    assert!(low_len < high_len, "q10 {low_len} bytes vs q95 {high_len} bytes");
}

#[test]
fn deleted_artifact_is_regenerated() {
    let base = TestBase::new().with_image("cat.png", 64, 64);
    let cache = open(&base);

    let artifact = cache.thumbnail("cat.png", 16, 16).unwrap();
    fs::remove_file(artifact.absolute_artifact_path()).unwrap();

    let again = cache.thumbnail("cat.png", 16, 16).unwrap();
    assert_eq!(again.outcome(), Outcome::Generated);
    assert!(again.absolute_artifact_path().is_file());
}

#[test]
fn locate_reports_without_creating_buckets() {
    let base = TestBase::new().with_image("cat.png", 64, 64);
    let cache = open(&base);
    let request = TransformRequest::thumbnail(16, 16);

    assert_eq!(cache.locate("cat.png", &request).unwrap().outcome(), Outcome::Missing);
    assert_eq!(entries(base.path()), ["cat.png"]);

    cache.process("cat.png", &request).unwrap();
    assert_eq!(cache.locate("cat.png", &request).unwrap().outcome(), Outcome::Hit);
}

#[cfg(unix)]
#[test]
fn artifacts_and_buckets_get_configured_modes() {
    use std::os::unix::fs::PermissionsExt;

    let base = TestBase::new().with_image("cat.png", 64, 64);
    let config = CacheConfig {
        file_mode: 0o640,
        dir_mode: 0o750,
        ..CacheConfig::with_base(base.path())
    };
    let cache = ImageCache::new(
        LocalStorage::new(base.path()).unwrap(),
        RasterCodec::new(),
        config,
    )
    .unwrap();

    let artifact = cache.resize("cat.png", 8, 8).unwrap();
    let file_mode = fs::metadata(artifact.absolute_artifact_path())
        .unwrap()
        .permissions()
        .mode();
    let dir_mode = fs::metadata(artifact.absolute_path()).unwrap().permissions().mode();
    assert_eq!(file_mode & 0o777, 0o640);
    assert_eq!(dir_mode & 0o777, 0o750);
}

#[test]
fn config_file_relative_base_is_anchored_to_its_directory() {
    let config = TestConfig::toml("base_folder = \"images\"\nquality = 70\nvisibility = \"hidden\"\n");
    let images = config.dir.path().join("images");
    fs::create_dir_all(&images).unwrap();
    crate::common::fixtures::gradient(40, 40)
        .save(images.join("cat.png"))
        .unwrap();

    let loaded = load_config_file(&config.config_path).unwrap();
    assert_eq!(loaded.quality, 70);

    let cache = ImageCache::from_config(loaded).unwrap();
    let artifact = cache.thumbnail("cat.png", 10, 10).unwrap();
    assert_eq!(artifact.public_path(), ".cache/thumbnail/10/10/cat.png");
    assert!(images.join(".cache/thumbnail/10/10/cat.png").is_file());
}
