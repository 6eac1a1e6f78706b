//! End-to-end tests: URL list -> task pool -> HTTP executor -> files on disk

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{
    collect_results, fast_fetch_config, file_names, mount_png, mount_status, small_pool_config,
};
use fetch_pool::sources::{load_url_list, read_url_list};
use fetch_pool::{
    BehaviorFlags, Error, HttpExecutor, Lifecycle, PoolConfig, TaskErrorKind, TaskPool, WorkItem,
    run_batch,
};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn url_list_batch_writes_thumbnails_and_tallies_failures() {
    let server = MockServer::start().await;
    for i in 0..12 {
        mount_png(&server, &format!("/img/{i}.png"), 120 + i, 80).await;
    }
    mount_status(&server, "/img/missing.png", 404).await;
    mount_status(&server, "/img/broken.png", 500).await;

    let mut list = NamedTempFile::new().unwrap();
    writeln!(list, "# id url").unwrap();
    for i in 0..12 {
        writeln!(list, "n{i:02} {}/img/{i}.png", server.uri()).unwrap();
    }
    writeln!(list, "lost {}/img/missing.png", server.uri()).unwrap();
    writeln!(list, "err {}/img/broken.png", server.uri()).unwrap();

    let out = TempDir::new().unwrap();
    let items: Vec<WorkItem> = load_url_list(list.path(), 0, None)
        .unwrap()
        .into_iter()
        .map(|entry| entry.into_work_item(out.path(), BehaviorFlags::default()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(items.len(), 14);

    let executor = Arc::new(HttpExecutor::new(&fast_fetch_config()).unwrap());
    let pool = TaskPool::new(&PoolConfig::new(3, 5), executor).unwrap();
    let summary = run_batch(&pool, items, Duration::from_secs(5)).await.unwrap();

    assert_eq!(summary.submitted, 14);
    assert_eq!(summary.succeeded, 12);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.abandoned, 0);

    let mut failures: Vec<_> = summary
        .failures
        .iter()
        .map(|(id, e)| (id.as_str(), e.kind))
        .collect();
    failures.sort_by_key(|(id, _)| *id);
    assert_eq!(
        failures,
        [
            ("err", TaskErrorKind::Network),
            ("lost", TaskErrorKind::InvalidResponse)
        ]
    );

    let names = file_names(out.path());
    assert_eq!(names.len(), 12);
    assert!(names.iter().all(|n| n.ends_with("-thumb.jpg")));
    assert_eq!(pool.lifecycle(), Lifecycle::Terminated);
}

#[tokio::test]
async fn skip_and_limit_select_part_of_the_list() {
    let server = MockServer::start().await;
    for i in 0..6 {
        mount_png(&server, &format!("/{i}.png"), 10, 10).await;
    }
    let list: String = (0..6)
        .map(|i| format!("id{i} {}/{i}.png\n", server.uri()))
        .collect();
    let out = TempDir::new().unwrap();

    let items: Vec<WorkItem> = read_url_list(Cursor::new(list), 2, Some(3))
        .unwrap()
        .into_iter()
        .map(|entry| entry.into_work_item(out.path(), BehaviorFlags::default()))
        .collect::<Result<_, _>>()
        .unwrap();

    let executor = Arc::new(HttpExecutor::new(&fast_fetch_config()).unwrap());
    let pool = TaskPool::new(&small_pool_config(), executor).unwrap();
    let summary = run_batch(&pool, items, Duration::from_secs(5)).await.unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(
        file_names(out.path()),
        ["id2-thumb.jpg", "id3-thumb.jpg", "id4-thumb.jpg"]
    );
}

#[tokio::test]
async fn forced_shutdown_abandons_slow_downloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    let out = TempDir::new().unwrap();

    let executor = Arc::new(HttpExecutor::new(&fast_fetch_config()).unwrap());
    let pool = TaskPool::new(&PoolConfig::new(3, 10), executor).unwrap();
    for i in 0..3 {
        let item = WorkItem::new(
            format!("slow{i}"),
            format!("{}/slow/{i}.png", server.uri()),
            out.path(),
        )
        .unwrap();
        pool.submit(item).unwrap();
    }
    // Let the workers start their requests
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    let report = pool.shutdown(Duration::ZERO).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!report.drained);
    assert_eq!(report.abandoned, 3);

    assert!(pool.try_retrieve().is_none());
    assert!(matches!(
        pool.retrieve().await,
        Err(Error::Terminated { abandoned: 3 })
    ));
    assert!(file_names(out.path()).is_empty());
}

#[tokio::test]
async fn manual_driver_loop_with_polling() {
    let server = MockServer::start().await;
    for i in 0..10 {
        mount_png(&server, &format!("/p/{i}.png"), 40, 40).await;
    }
    let out = TempDir::new().unwrap();

    let executor = Arc::new(HttpExecutor::new(&fast_fetch_config()).unwrap());
    let pool = TaskPool::new(&PoolConfig::new(2, 3), executor).unwrap();

    let mut pending: Vec<WorkItem> = (0..10)
        .map(|i| {
            WorkItem::new(
                format!("p{i}"),
                format!("{}/p/{i}.png", server.uri()),
                out.path(),
            )
            .unwrap()
        })
        .collect();
    let mut done = Vec::new();

    while !pending.is_empty() || pool.outstanding() > 0 {
        while pool.has_capacity() {
            let Some(item) = pending.pop() else { break };
            pool.submit(item).unwrap();
            assert!(pool.outstanding() <= 3);
        }
        match pool.try_retrieve() {
            Some(result) => done.push(result),
            None if pool.outstanding() > 0 => {
                done.extend(collect_results(&pool, 1, Duration::from_secs(5)).await)
            }
            None => {}
        }
    }

    assert_eq!(done.len(), 10);
    assert!(done.iter().all(|r| r.is_success()));
    assert!(matches!(pool.retrieve().await, Err(Error::NoPendingWork)));

    let report = pool.shutdown(Duration::from_secs(5)).await.unwrap();
    assert!(report.drained);
    assert_eq!(report.published, 10);
    assert_eq!(file_names(out.path()).len(), 10);
}
