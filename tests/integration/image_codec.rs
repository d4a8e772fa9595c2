//! Codec behavior on real encoded files.

use image::{ColorType, GenericImageView};
use imgcache::cache::{ImageCache, Outcome};
use imgcache::codec::{ImageCodec, RasterCodec, format_for_path};
use imgcache::config::CacheConfig;
use imgcache::error::CacheError;

use crate::common::fixtures::TestBase;

fn open(base: &TestBase) -> ImageCache<imgcache::storage::BoxedStorage, RasterCodec> {
    ImageCache::from_config(CacheConfig::with_base(base.path())).unwrap()
}

#[test]
fn output_format_follows_source_extension() {
    let base = TestBase::new()
        .with_image("a.png", 64, 64)
        .with_image("b.jpg", 64, 64)
        .with_image("c.bmp", 64, 64)
        .with_image("d.gif", 64, 64);
    let cache = open(&base);

    for (source, expected) in [
        ("a.png", image::ImageFormat::Png),
        ("b.jpg", image::ImageFormat::Jpeg),
        ("c.bmp", image::ImageFormat::Bmp),
        ("d.gif", image::ImageFormat::Gif),
    ] {
        let artifact = cache.thumbnail(source, 20, 20).unwrap();
        let path = artifact.absolute_artifact_path();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), expected, "{source}");
        assert_eq!(image::image_dimensions(&path).unwrap(), (20, 20), "{source}");
    }
}

#[test]
fn png_artifacts_keep_alpha() {
    let base = TestBase::new().with_rgba_image("icon.png", 64, 64);
    let cache = open(&base);

    let artifact = cache.resize("icon.png", 32, 32).unwrap();
    let decoded = image::open(artifact.absolute_artifact_path()).unwrap();
    assert!(decoded.color().has_alpha());
    let alpha = decoded.get_pixel(10, 10).0[3];
    assert!((126..=130).contains(&alpha), "alpha {alpha}");
}

#[test]
fn jpeg_encoding_drops_alpha() {
    let codec = RasterCodec::new();
    let base = TestBase::new().with_rgba_image("icon.png", 16, 16);
    let bytes = std::fs::read(base.join("icon.png")).unwrap();

    let image = codec.decode(&bytes).unwrap();
    let encoded = codec.encode(&image, image::ImageFormat::Jpeg, 80).unwrap();
    let decoded = image::load_from_memory(&encoded).unwrap();
    assert_eq!(decoded.color(), ColorType::Rgb8);
}

#[test]
fn probe_matches_decode_for_real_files() {
    let codec = RasterCodec::new();
    let base = TestBase::new().with_image("p.jpg", 123, 45).with_image("q.png", 7, 300);

    for name in ["p.jpg", "q.png"] {
        let bytes = std::fs::read(base.join(name)).unwrap();
        let probed = codec.probe(&bytes).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(probed, codec.dimensions(&decoded), "{name}");
    }
}

#[test]
fn thumbnail_of_extreme_aspect_is_exact() {
    let base = TestBase::new().with_image("strip.png", 1000, 7);
    let config = CacheConfig {
        allow_enlarge: true,
        ..CacheConfig::with_base(base.path())
    };
    let cache = ImageCache::from_config(config).unwrap();

    let artifact = cache.thumbnail("strip.png", 50, 50).unwrap();
    assert_eq!(artifact.outcome(), Outcome::Generated);
    assert_eq!(
        image::image_dimensions(artifact.absolute_artifact_path()).unwrap(),
        (50, 50)
    );
}

#[test]
fn unknown_extension_is_unsupported() {
    assert!(matches!(
        format_for_path(std::path::Path::new("notes.txt")),
        Err(CacheError::UnsupportedFormat(_))
    ));

    let base = TestBase::new().with_file("notes.txt", b"hello");
    let cache = open(&base);
    assert!(matches!(
        cache.thumbnail("notes.txt", 10, 10),
        Err(CacheError::UnsupportedFormat(_))
    ));
}

#[test]
fn pixel_ceiling_rejects_heavy_sources() {
    let base = TestBase::new().with_image("big.png", 300, 300);
    let config = CacheConfig {
        max_pixels: 50_000,
        ..CacheConfig::with_base(base.path())
    };
    let cache = ImageCache::from_config(config).unwrap();

    let err = cache.thumbnail("big.png", 10, 10).unwrap_err();
    assert!(matches!(
        err,
        CacheError::TooHeavy {
            width: 300,
            height: 300,
            max_pixels: 50_000
        }
    ));
    assert!(!base.join("thumbnail").exists());
}
