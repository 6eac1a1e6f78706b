//! Batch driver
//!
//! [`run_batch`] feeds a sequence of items through a [`TaskPool`] while keeping the number
//! of outstanding tasks within the pool's capacity: submit while there is room, otherwise
//! harvest a result, until every submitted item has come back. The pool is shut down at the
//! end.
//!
//! The driver assumes it is the only producer and consumer of the pool while it runs.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::{Result, TaskError};
use crate::pool::TaskPool;
use crate::types::{WorkItem, WorkResult};

/// Log a progress line every this many retrieved results
const PROGRESS_EVERY: usize = 100;

/// Tally of a completed batch
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchSummary {
    /// Items accepted by the pool
    pub submitted: usize,
    /// Results with a successful outcome
    pub succeeded: usize,
    /// Results with a failed outcome
    pub failed: usize,
    /// Id and error of every failed item, in completion order
    pub failures: Vec<(String, TaskError)>,
    /// Items abandoned by the final shutdown (normally zero)
    pub abandoned: u64,
    /// Wall-clock duration of the whole batch, shutdown included
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Results retrieved so far
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    fn record(&mut self, result: &WorkResult) {
        match &result.outcome {
            Ok(_) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                self.failures.push((result.id.clone(), e.clone()));
            }
        }
    }
}

/// Run every item through the pool, then shut it down
///
/// See [`run_batch_with`] to observe each result as it arrives.
pub async fn run_batch<I>(pool: &TaskPool, items: I, grace: Duration) -> Result<BatchSummary>
where
    I: IntoIterator<Item = WorkItem>,
{
    run_batch_with(pool, items, grace, |_| {}).await
}

/// Run every item through the pool, calling `on_result` for each retrieved result
///
/// # Errors
///
/// Propagates pool errors: [`Error::ShuttingDown`](crate::error::Error::ShuttingDown) if the
/// pool was shut down by someone else, [`Error::Terminated`](crate::error::Error::Terminated)
/// if results were abandoned, and errors from the final shutdown.
pub async fn run_batch_with<I, F>(
    pool: &TaskPool,
    items: I,
    grace: Duration,
    mut on_result: F,
) -> Result<BatchSummary>
where
    I: IntoIterator<Item = WorkItem>,
    F: FnMut(&WorkResult),
{
    let started = Instant::now();
    let mut items = items.into_iter().peekable();
    let mut summary = BatchSummary::default();

    tracing::info!(
        workers = pool.worker_count(),
        max_outstanding = pool.max_outstanding(),
        "batch started"
    );

    loop {
        while pool.has_capacity() {
            let Some(item) = items.next() else { break };
            pool.submit(item)?;
            summary.submitted += 1;
        }

        if pool.outstanding() > 0 {
            let result = pool.retrieve().await?;
            summary.record(&result);
            on_result(&result);

            if let Err(e) = &result.outcome {
                tracing::debug!(item_id = %result.id, error = %e, "batch item failed");
            }
            if summary.completed() % PROGRESS_EVERY == 0 {
                tracing::info!(
                    completed = summary.completed(),
                    submitted = summary.submitted,
                    failed = summary.failed,
                    outstanding = pool.outstanding(),
                    "batch progress"
                );
            }
        } else if items.peek().is_none() {
            break;
        }
    }

    let report = pool.shutdown(grace).await?;
    summary.abandoned = report.abandoned;
    summary.elapsed = started.elapsed();

    tracing::info!(
        submitted = summary.submitted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "batch finished"
    );
    Ok(summary)
}
