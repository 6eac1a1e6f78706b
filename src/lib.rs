//! # fetch-pool
//!
//! Admission-controlled async task pool for bulk downloading of remote resources.
//!
//! ## Design Philosophy
//!
//! fetch-pool is designed to be:
//! - **Bounded** - The caller checks capacity before submitting, so memory stays flat no
//!   matter how long the input list is
//! - **Completion-ordered** - Results come back as soon as they are ready, not in
//!   submission order
//! - **Failure-tolerant** - A failed or panicking item is just a result with an error; it
//!   never takes a worker down
//! - **Library-first** - No CLI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetch_pool::{Config, HttpExecutor, TaskPool, run_batch};
//! use fetch_pool::sources::load_url_list;
//! use fetch_pool::types::BehaviorFlags;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let executor = Arc::new(HttpExecutor::new(&config.fetch)?);
//!     let pool = TaskPool::new(&config.pool, executor)?;
//!
//!     let items = load_url_list(Path::new("urls.txt"), 0, Some(1000))?
//!         .into_iter()
//!         .map(|entry| entry.into_work_item(Path::new("images"), BehaviorFlags::default()))
//!         .collect::<Result<Vec<_>, _>>()?;
//!
//!     let summary = run_batch(&pool, items, config.pool.shutdown_grace).await?;
//!     println!("{} ok, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Batch driver loop
pub mod driver;
/// Error types
pub mod error;
/// Work item executors (HTTP download, closures)
pub mod executor;
/// Admission-controlled task pool
pub mod pool;
/// Retry logic with exponential backoff
pub mod retry;
/// URL list input
pub mod sources;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{AdmissionPolicy, Config, FetchConfig, PoolConfig};
pub use driver::{BatchSummary, run_batch, run_batch_with};
pub use error::{Error, Result, TaskError, TaskErrorKind};
pub use executor::{FnExecutor, HttpExecutor, TaskExecutor};
pub use pool::TaskPool;
pub use types::{
    Artifact, BehaviorFlags, Lifecycle, PoolStats, ShutdownReport, WorkItem, WorkResult,
};
