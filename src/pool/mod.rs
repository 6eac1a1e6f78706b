//! Admission-controlled task pool
//!
//! [`TaskPool`] runs a fixed set of workers over a shared work queue. Callers submit
//! [`WorkItem`]s and pull [`WorkResult`]s back in completion order, using
//! [`outstanding`](TaskPool::outstanding) and [`has_capacity`](TaskPool::has_capacity)
//! to keep the number of un-retrieved tasks bounded.
//!
//! ```no_run
//! use fetch_pool::{Artifact, FnExecutor, PoolConfig, TaskError, TaskPool, WorkItem};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> fetch_pool::Result<()> {
//! let executor = Arc::new(FnExecutor::new(|item: WorkItem| async move {
//!     Ok::<_, TaskError>(Artifact { bytes: item.id().len() as u64, ..Default::default() })
//! }));
//! let pool = TaskPool::new(&PoolConfig::new(4, 16), executor)?;
//!
//! pool.submit(WorkItem::new("a", "mem://a", "out")?)?;
//! let result = pool.retrieve().await?;
//! assert_eq!(result.id, "a");
//!
//! pool.shutdown(Duration::from_secs(10)).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::executor::TaskExecutor;
use crate::types::{Lifecycle, PoolStats, ShutdownReport, WorkItem, WorkResult};

mod admission;
mod worker;

use admission::Admission;
use worker::Worker;

/// Worker handles plus the report of a completed shutdown
struct Workers {
    set: JoinSet<()>,
    report: Option<ShutdownReport>,
}

/// Fixed-size pool of workers with outstanding-task accounting
///
/// All methods take `&self`; share the pool across tasks with an `Arc`. Dropping the pool
/// aborts its workers.
pub struct TaskPool {
    work_tx: async_channel::Sender<WorkItem>,
    results: Mutex<mpsc::UnboundedReceiver<WorkResult>>,
    admission: Admission,
    workers: Mutex<Workers>,
    worker_count: usize,
    lifecycle: AtomicU8,
    cancel: CancellationToken,
    submitted: AtomicU64,
    published: Arc<AtomicU64>,
    executor_name: &'static str,
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("executor", &self.executor_name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl TaskPool {
    /// Create a pool and start its workers on the current Tokio runtime
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration and [`Error::NoRuntime`] when
    /// called outside of a runtime.
    pub fn new(config: &PoolConfig, executor: Arc<dyn TaskExecutor>) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;

        let (work_tx, work_rx) = async_channel::unbounded();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let published = Arc::new(AtomicU64::new(0));
        let executor_name = executor.name();

        let mut set = JoinSet::new();
        for id in 0..config.workers {
            let worker = Worker {
                id,
                work_rx: work_rx.clone(),
                result_tx: result_tx.clone(),
                executor: Arc::clone(&executor),
                task_timeout: config.task_timeout,
                cancel: cancel.clone(),
                published: Arc::clone(&published),
            };
            set.spawn_on(worker.run(), &runtime);
        }
        // Only workers hold result senders, so the channel closes once they are all gone
        drop(result_tx);

        tracing::info!(
            workers = config.workers,
            max_outstanding = config.max_outstanding,
            admission = ?config.admission,
            task_timeout_ms = config.task_timeout.map(|t| t.as_millis() as u64),
            executor = executor_name,
            "task pool started"
        );

        Ok(Self {
            work_tx,
            results: Mutex::new(result_rx),
            admission: Admission::new(config.max_outstanding, config.admission),
            workers: Mutex::new(Workers { set, report: None }),
            worker_count: config.workers,
            lifecycle: AtomicU8::new(Lifecycle::Running.to_u8()),
            cancel,
            submitted: AtomicU64::new(0),
            published,
            executor_name,
        })
    }

    /// Enqueue an item for execution
    ///
    /// Never blocks. Under advisory admission the item is accepted even past
    /// `max_outstanding`; callers are expected to check [`has_capacity`](Self::has_capacity)
    /// first.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has begun; the item is dropped and nothing is
    ///   counted
    /// - [`Error::AtCapacity`] under enforced admission when the cap is reached
    pub fn submit(&self, item: WorkItem) -> Result<()> {
        if self.lifecycle() != Lifecycle::Running {
            return Err(Error::ShuttingDown);
        }
        self.admission.admit()?;
        self.submitted.fetch_add(1, Ordering::SeqCst);

        let item_id = item.id().to_string();
        if self.work_tx.try_send(item).is_err() {
            // Lost the race against shutdown closing the queue
            self.submitted.fetch_sub(1, Ordering::SeqCst);
            self.admission.revoke();
            return Err(Error::ShuttingDown);
        }

        tracing::trace!(
            item_id = %item_id,
            outstanding = self.admission.outstanding(),
            "item submitted"
        );
        Ok(())
    }

    /// Take one completed result without waiting
    ///
    /// Returns `None` when no result is ready, including when nothing is outstanding or when
    /// another caller is currently waiting in [`retrieve`](Self::retrieve).
    pub fn try_retrieve(&self) -> Option<WorkResult> {
        let mut results = self.results.try_lock().ok()?;
        let result = results.try_recv().ok()?;
        let _release = self.admission.release_on_drop();
        self.log_retrieved(&result);
        Some(result)
    }

    /// Wait for the next completed result
    ///
    /// # Errors
    ///
    /// - [`Error::NoPendingWork`] when every submitted item has already been retrieved
    /// - [`Error::Terminated`] when the pool was force-terminated and the results still owed
    ///   will never arrive
    pub async fn retrieve(&self) -> Result<WorkResult> {
        if self.admission.outstanding() == 0 {
            return Err(Error::NoPendingWork);
        }

        let mut results = self.results.lock().await;
        // Another retriever may have taken the last result while we waited for the lock
        if self.admission.outstanding() == 0 {
            return Err(Error::NoPendingWork);
        }

        match results.recv().await {
            Some(result) => {
                let _release = self.admission.release_on_drop();
                self.log_retrieved(&result);
                Ok(result)
            }
            None => Err(Error::Terminated {
                abandoned: self.admission.outstanding(),
            }),
        }
    }

    /// Submitted but not yet retrieved
    pub fn outstanding(&self) -> usize {
        self.admission.outstanding()
    }

    /// Whether `outstanding() < max_outstanding`
    pub fn has_capacity(&self) -> bool {
        self.admission.has_capacity()
    }

    /// Configured admission threshold
    pub fn max_outstanding(&self) -> usize {
        self.admission.max_outstanding()
    }

    /// Number of workers the pool was started with
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::SeqCst))
    }

    /// Point-in-time statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.worker_count,
            outstanding: self.admission.outstanding(),
            max_outstanding: self.admission.max_outstanding(),
            queued: self.work_tx.len(),
            submitted: self.submitted.load(Ordering::SeqCst),
            published: self.published.load(Ordering::SeqCst),
            lifecycle: self.lifecycle(),
        }
    }

    /// Stop accepting work and wait up to `grace` for workers to finish
    ///
    /// Queued items are still executed while the grace period lasts. When it runs out,
    /// in-flight executions are cancelled and queued items are discarded; their results are
    /// never produced. Results published before that remain retrievable.
    ///
    /// Cancellation stops an execution at its next `.await`. Work an executor already handed
    /// to a blocking thread (`spawn_blocking`, including `tokio::fs` calls) runs to
    /// completion, so a forced shutdown can still be followed by a file write from a
    /// cancelled item. [`HttpExecutor`](crate::executor::HttpExecutor) keeps its blocking step
    /// free of filesystem access, leaving only a write that was already in progress.
    ///
    /// Calling this again after it completed returns the same report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerLost`] if any worker exited abnormally. The pool is terminated
    /// regardless.
    pub async fn shutdown(&self, grace: Duration) -> Result<ShutdownReport> {
        let mut workers = self.workers.lock().await;
        if let Some(report) = &workers.report {
            tracing::debug!("shutdown already completed");
            return Ok(report.clone());
        }

        let started = Instant::now();
        self.set_lifecycle(Lifecycle::ShuttingDown);
        self.work_tx.close();

        tracing::info!(
            grace_ms = grace.as_millis() as u64,
            queued = self.work_tx.len(),
            outstanding = self.admission.outstanding(),
            "shutting down task pool"
        );

        let set = &mut workers.set;
        let mut lost = 0;
        let joined = tokio::time::timeout(grace, async {
            while let Some(joined) = set.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "worker exited abnormally");
                    lost += 1;
                }
            }
        })
        .await;

        let (drained, forced_workers) = match joined {
            Ok(()) => (true, 0),
            Err(_) => {
                let remaining = set.len();
                tracing::warn!(
                    remaining,
                    queued = self.work_tx.len(),
                    "grace period elapsed, cancelling in-flight work"
                );
                self.cancel.cancel();
                set.shutdown().await;
                (false, remaining)
            }
        };

        let published = self.published.load(Ordering::SeqCst);
        let submitted = self.submitted.load(Ordering::SeqCst);
        let report = ShutdownReport {
            drained,
            forced_workers,
            published,
            abandoned: submitted.saturating_sub(published),
            elapsed: started.elapsed(),
        };
        self.set_lifecycle(Lifecycle::Terminated);
        workers.report = Some(report.clone());

        if report.abandoned > 0 {
            tracing::warn!(
                abandoned = report.abandoned,
                published = report.published,
                "task pool terminated with abandoned work"
            );
        } else {
            tracing::info!(
                published = report.published,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "task pool terminated"
            );
        }

        if lost > 0 {
            return Err(Error::WorkerLost { count: lost });
        }
        Ok(report)
    }

    fn set_lifecycle(&self, state: Lifecycle) {
        self.lifecycle.store(state.to_u8(), Ordering::SeqCst);
    }

    fn log_retrieved(&self, result: &WorkResult) {
        tracing::trace!(
            item_id = %result.id,
            success = result.is_success(),
            outstanding = self.admission.outstanding().saturating_sub(1),
            "result retrieved"
        );
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // The JoinSet aborts the worker tasks; cancelling first lets in-flight
        // executions observe it at their next await point
        self.cancel.cancel();
    }
}
