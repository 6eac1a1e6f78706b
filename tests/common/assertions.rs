//! Custom assertions for artifacts and pool results

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use fetch_pool::{TaskPool, WorkResult};
use std::path::Path;
use std::time::Duration;

/// Assert that `path` holds a decodable image of exactly `width` x `height`
pub fn assert_image_dims(path: &Path, width: u32, height: u32) {
    let img = image::open(path)
        .unwrap_or_else(|e| panic!("{} is not a readable image: {}", path.display(), e));
    assert_eq!(
        (img.width(), img.height()),
        (width, height),
        "unexpected dimensions for {}",
        path.display()
    );
}

/// Names of the files directly inside `dir`, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Retrieve `count` results, failing the test if they take longer than `timeout`
pub async fn collect_results(pool: &TaskPool, count: usize, timeout: Duration) -> Vec<WorkResult> {
    tokio::time::timeout(timeout, async {
        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            results.push(pool.retrieve().await.unwrap());
        }
        results
    })
    .await
    .expect("results did not arrive in time")
}
