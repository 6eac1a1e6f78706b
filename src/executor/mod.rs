//! Work item executors
//!
//! The pool is agnostic to what "executing" an item means. It hands each [`WorkItem`] to a
//! [`TaskExecutor`] and publishes whatever outcome comes back. [`HttpExecutor`] is the
//! download-and-thumbnail executor; [`FnExecutor`] adapts a closure, which is handy for
//! tests and non-HTTP workloads.

use async_trait::async_trait;
use std::future::Future;

use crate::error::TaskError;
use crate::types::{Artifact, WorkItem};

mod http;
mod thumbnail;

pub use http::HttpExecutor;
pub use thumbnail::{Thumbnail, render_thumbnail, write_thumbnail};

/// Trait for executing a single work item
///
/// Implementations must be safe to call from many workers at once. Failures are reported as
/// [`TaskError`] values and end up in the item's [`WorkResult`](crate::types::WorkResult);
/// a panic is caught by the worker and reported as [`TaskErrorKind::Panicked`](crate::error::TaskErrorKind::Panicked).
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Execute one item
    async fn execute(&self, item: &WorkItem) -> Result<Artifact, TaskError>;

    /// Short name used in log output
    fn name(&self) -> &'static str;
}

/// Executor backed by an async closure
pub struct FnExecutor<F> {
    f: F,
    name: &'static str,
}

impl<F> FnExecutor<F> {
    /// Wrap a closure receiving an owned copy of each item
    pub fn new(f: F) -> Self {
        Self { f, name: "fn" }
    }

    /// Wrap a closure under a custom log name
    pub fn named(name: &'static str, f: F) -> Self {
        Self { f, name }
    }
}

impl<F> std::fmt::Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExecutor").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> TaskExecutor for FnExecutor<F>
where
    F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Artifact, TaskError>> + Send + 'static,
{
    async fn execute(&self, item: &WorkItem) -> Result<Artifact, TaskError> {
        (self.f)(item.clone()).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
