//! Bulk thumbnail download example
//!
//! This example demonstrates the core functionality of fetch-pool:
//! - Loading an `id url` list from disk
//! - Creating a task pool backed by the HTTP executor
//! - Driving submissions with admission control
//! - Harvesting results in completion order and shutting down
//!
//! Usage: `cargo run --example download_list -- urls.txt images/ [skip] [limit]`

use fetch_pool::config::{Config, FileCollisionAction};
use fetch_pool::sources::load_url_list;
use fetch_pool::{BehaviorFlags, HttpExecutor, TaskPool, run_batch_with};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let urls_file = PathBuf::from(args.next().unwrap_or_else(|| "urls.txt".to_string()));
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "images".to_string()));
    let skip: usize = args.next().map(|s| s.parse::<usize>()).transpose()?.unwrap_or(0);
    let limit: Option<usize> = args.next().map(|s| s.parse::<usize>()).transpose()?;

    // Ten pending tasks per worker, keep existing files
    let mut config = Config::default();
    config.pool.workers = 20;
    config.pool.max_outstanding = config.pool.workers * 10;
    config.fetch.file_collision = FileCollisionAction::Rename;
    config.validate()?;

    let flags = BehaviorFlags {
        save_original: false,
        save_derived: true,
        follow_redirects: false,
    };
    let items = load_url_list(&urls_file, skip, limit)?
        .into_iter()
        .map(|entry| entry.into_work_item(&output_dir, flags))
        .collect::<Result<Vec<_>, _>>()?;
    println!("Downloading {} images into {}", items.len(), output_dir.display());

    let executor = Arc::new(HttpExecutor::new(&config.fetch)?);
    let pool = TaskPool::new(&config.pool, executor)?;

    let started = Instant::now();
    let total = items.len();
    let summary = run_batch_with(&pool, items, config.pool.shutdown_grace, |result| {
        match &result.outcome {
            Ok(artifact) => println!("✓ {} ({} bytes)", result.id, artifact.bytes),
            Err(e) => println!("✗ {}: {}", result.id, e),
        }
    })
    .await?;

    println!(
        "\nDone: {}/{} succeeded, {} failed in {:.1}s",
        summary.succeeded,
        total,
        summary.failed,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
