//! Worker loop
//!
//! Each worker pulls items from the shared work queue, runs them through the executor and
//! publishes exactly one [`WorkResult`] per item on the completion channel.

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::executor::TaskExecutor;
use crate::types::{Artifact, WorkItem, WorkResult};

pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) work_rx: async_channel::Receiver<WorkItem>,
    pub(crate) result_tx: mpsc::UnboundedSender<WorkResult>,
    pub(crate) executor: Arc<dyn TaskExecutor>,
    pub(crate) task_timeout: Option<Duration>,
    pub(crate) cancel: CancellationToken,
    pub(crate) published: Arc<AtomicU64>,
}

impl Worker {
    /// Run until the work queue is closed and drained, or until cancelled.
    pub(crate) async fn run(self) {
        tracing::debug!(worker = self.id, "worker started");

        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                received = self.work_rx.recv() => match received {
                    Ok(item) => item,
                    // Closed and empty
                    Err(_) => break,
                },
            };

            let started = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::warn!(
                        worker = self.id,
                        item_id = %item.id(),
                        "execution cancelled by forced shutdown"
                    );
                    break;
                }
                outcome = self.execute(&item) => outcome,
            };
            let elapsed = started.elapsed();

            match &outcome {
                Ok(artifact) => tracing::debug!(
                    worker = self.id,
                    item_id = %item.id(),
                    bytes = artifact.bytes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "item completed"
                ),
                Err(e) => tracing::warn!(
                    worker = self.id,
                    item_id = %item.id(),
                    kind = %e.kind,
                    error = %e.message,
                    "item failed"
                ),
            }

            let result = WorkResult {
                id: item.id().to_string(),
                outcome,
                worker: self.id,
                elapsed,
                completed_at: Utc::now(),
            };

            self.published.fetch_add(1, Ordering::SeqCst);
            if self.result_tx.send(result).is_err() {
                tracing::debug!(worker = self.id, "result receiver dropped, stopping");
                break;
            }
        }

        tracing::debug!(worker = self.id, "worker stopped");
    }

    /// Execute one item, converting panics and timeouts into task errors.
    async fn execute(&self, item: &WorkItem) -> Result<Artifact, TaskError> {
        let guarded = AssertUnwindSafe(self.executor.execute(item)).catch_unwind();
        let run = async move {
            match guarded.await {
                Ok(outcome) => outcome,
                Err(payload) => Err(TaskError::panicked(panic_message(payload.as_ref()))),
            }
        };

        match self.task_timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.unwrap_or_else(|_| {
                Err(TaskError::timeout(format!(
                    "execution exceeded {}ms",
                    limit.as_millis()
                )))
            }),
            None => run.await,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "executor panicked with a non-string payload".to_string()
    }
}
