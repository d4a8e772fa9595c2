//! Parallel requests against one cache.

use std::sync::{Arc, Barrier};
use std::thread;

use imgcache::cache::{ImageCache, Outcome, TransformRequest};
use imgcache::codec::{MockCodec, RasterCodec};
use imgcache::config::CacheConfig;
use imgcache::storage::{LocalStorage, MemoryStorage};

use crate::common::fixtures::TestBase;

const THREADS: usize = 8;

#[test]
fn racing_writers_leave_one_complete_artifact() {
    let base = TestBase::new().with_image("photos/cat.jpg", 640, 480);
    let storage = LocalStorage::new(base.path()).unwrap();
    let cache = Arc::new(
        ImageCache::new(storage, RasterCodec::new(), CacheConfig::with_base(base.path())).unwrap(),
    );
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.thumbnail("photos/cat.jpg", 120, 120)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    let path = results[0].absolute_artifact_path();
    assert!(results.iter().all(|r| r.absolute_artifact_path() == path));
    assert!(results.iter().any(|r| r.outcome() == Outcome::Generated));
    assert_eq!(image::image_dimensions(&path).unwrap(), (120, 120));

    // No temp files left behind next to the artifact
    let bucket: Vec<_> = std::fs::read_dir(results[0].absolute_path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(bucket, ["cat.jpg"]);
}

#[test]
fn distinct_keys_in_parallel_do_not_interfere() {
    let storage = MemoryStorage::new("/srv/img");
    storage.insert_file("cat.png", MockCodec::fixture(800, 600));
    let cache = Arc::new(ImageCache::new(storage, MockCodec::new(), CacheConfig::default()).unwrap());

    let handles: Vec<_> = (1..=THREADS as u32)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let request = TransformRequest::scale(Some(i * 10), None);
                cache.process("cat.png", &request).unwrap()
            })
        })
        .collect();

    for (i, handle) in (1..=THREADS as u32).zip(handles) {
        let artifact = handle.join().unwrap();
        assert_eq!(artifact.outcome(), Outcome::Generated);
        assert_eq!(artifact.public_path(), format!("scaled/{}/auto/cat.png", i * 10));
    }
    assert_eq!(cache.storage().write_count(), THREADS);
}

#[test]
fn hits_from_many_threads_do_no_codec_work() {
    let storage = MemoryStorage::new("/srv/img");
    storage.insert_file("cat.png", MockCodec::fixture(800, 600));
    let cache = Arc::new(ImageCache::new(storage, MockCodec::new(), CacheConfig::default()).unwrap());

    cache.thumbnail("cat.png", 64, 64).unwrap();
    cache.codec().clear();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.thumbnail("cat.png", 64, 64).unwrap().outcome())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Outcome::Hit);
    }
    assert_eq!(cache.codec().operation_count(), 0);
}
