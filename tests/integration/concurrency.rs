//! Integration tests for concurrent access to one store.
//!
//! Operations for the same user are serialized, so readers never observe
//! the window between the backup rename and the new write.

use std::sync::Arc;
use std::thread;

use avatar_cache::normalize::{self, decode_canonical};
use image::ImageFormat;
use sha2::{Digest, Sha256};

use crate::common::fixtures::{TestImages, TestStore, user};

#[test]
fn test_concurrent_saves_for_one_user_leave_one_valid_avatar() {
    let images = TestImages::new();
    let sources: Vec<_> = (0u8..8)
        .map(|i| {
            let format = if i % 2 == 0 {
                ImageFormat::Png
            } else {
                ImageFormat::Jpeg
            };
            let ext = if i % 2 == 0 { "png" } else { "jpg" };
            images.solid(&format!("src{i}.{ext}"), 12, [i * 30, 0, 0], format)
        })
        .collect();
    let candidates: Vec<Vec<u8>> = sources
        .iter()
        .map(|src| normalize::normalize(src).unwrap().bytes)
        .collect();
    let ts = Arc::new(TestStore::new());
    let id = user("shared");

    let handles: Vec<_> = sources
        .into_iter()
        .map(|src| {
            let ts = Arc::clone(&ts);
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..3 {
                    ts.store.save(&id, &src).expect("save succeeds");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let bytes = ts.store.load(&id).unwrap().expect("avatar stored");
    decode_canonical(&bytes).expect("final avatar decodes");
    assert!(
        candidates.contains(&bytes),
        "final avatar must be exactly one of the inputs"
    );
    assert_eq!(ts.files_of(&id), vec!["profile.png"]);
}

#[test]
fn test_reads_during_saves_always_see_an_avatar() {
    let images = TestImages::new();
    let a = images.solid("a.png", 16, [200, 0, 0], ImageFormat::Png);
    let b = images.solid("b.jpg", 16, [0, 0, 200], ImageFormat::Jpeg);
    let ts = Arc::new(TestStore::new());
    let id = user("reader");
    ts.store.save(&id, &a).unwrap();

    let writer = {
        let ts = Arc::clone(&ts);
        let id = id.clone();
        thread::spawn(move || {
            for i in 0..20 {
                let src = if i % 2 == 0 { &b } else { &a };
                ts.store.save(&id, src).expect("save succeeds");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ts = Arc::clone(&ts);
            let id = id.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    let bytes = ts
                        .store
                        .load(&id)
                        .expect("load succeeds")
                        .expect("avatar never missing mid-save");
                    decode_canonical(&bytes).expect("avatar never torn");
                }
            })
        })
        .collect();

    writer.join().expect("writer thread panicked");
    for reader in readers {
        reader.join().expect("reader thread panicked");
    }
}

#[test]
fn test_info_matches_bytes_during_saves() {
    let images = TestImages::new();
    let a = images.solid("a.png", 10, [10, 200, 10], ImageFormat::Png);
    let b = images.solid("b.jpg", 14, [200, 10, 10], ImageFormat::Jpeg);
    let ts = Arc::new(TestStore::new());
    let id = user("meta");
    ts.store.save(&id, &a).unwrap();

    let writer = {
        let ts = Arc::clone(&ts);
        let id = id.clone();
        thread::spawn(move || {
            for i in 0..20 {
                let src = if i % 2 == 0 { &b } else { &a };
                ts.store.save(&id, src).expect("save succeeds");
            }
        })
    };

    for _ in 0..40 {
        let (bytes, info) = ts
            .store
            .load_with_info(&id)
            .expect("load succeeds")
            .expect("avatar present");
        assert_eq!(info.size_bytes, bytes.len());
        assert_eq!(info.sha256, hex::encode(Sha256::digest(&bytes)));
        let decoded = decode_canonical(&bytes).unwrap();
        assert_eq!((info.width, info.height), (decoded.width(), decoded.height()));
    }
    writer.join().expect("writer thread panicked");
}

#[test]
fn test_different_users_save_in_parallel() {
    let images = TestImages::new();
    let src = images.gradient("g.png", 16, ImageFormat::Png);
    let expected = std::fs::read(&src).unwrap();
    let ts = Arc::new(TestStore::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ts = Arc::clone(&ts);
            let src = src.clone();
            thread::spawn(move || {
                let id = user(&format!("user-{i}"));
                ts.store.save(&id, &src).expect("save succeeds");
                id
            })
        })
        .collect();

    for handle in handles {
        let id = handle.join().expect("writer thread panicked");
        assert_eq!(ts.store.load(&id).unwrap().unwrap(), expected);
    }
}
