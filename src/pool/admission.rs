//! Outstanding-task accounting for admission control.
//!
//! A task is outstanding from the moment `submit` accepts it until a retrieval hands its
//! result to the caller. The count is the only backpressure signal the pool exposes, so every
//! retrieval path releases through [`Release`], a drop guard, instead of a bare decrement.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::AdmissionPolicy;
use crate::error::{Error, Result};

#[derive(Debug)]
pub(crate) struct Admission {
    outstanding: AtomicUsize,
    max_outstanding: usize,
    policy: AdmissionPolicy,
}

impl Admission {
    pub(crate) fn new(max_outstanding: usize, policy: AdmissionPolicy) -> Self {
        Self {
            outstanding: AtomicUsize::new(0),
            max_outstanding,
            policy,
        }
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub(crate) fn max_outstanding(&self) -> usize {
        self.max_outstanding
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.outstanding() < self.max_outstanding
    }

    /// Count one submission.
    ///
    /// Advisory admission always counts. Enforced admission refuses at the cap without
    /// touching the counter.
    pub(crate) fn admit(&self) -> Result<()> {
        match self.policy {
            AdmissionPolicy::Advisory => {
                self.outstanding.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            AdmissionPolicy::Enforced => self
                .outstanding
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n < self.max_outstanding).then_some(n + 1)
                })
                .map(|_| ())
                .map_err(|_| Error::AtCapacity {
                    limit: self.max_outstanding,
                }),
        }
    }

    /// Undo an [`admit`](Self::admit) whose item never reached the work queue.
    pub(crate) fn revoke(&self) {
        self.release_one();
    }

    /// Guard that releases one outstanding slot when dropped.
    ///
    /// Create it as soon as a result has been taken off the completion channel.
    pub(crate) fn release_on_drop(&self) -> Release<'_> {
        Release { admission: self }
    }

    fn release_one(&self) {
        let released = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if released.is_err() {
            tracing::error!("outstanding counter release without a matching submission");
        }
    }
}

/// Releases one outstanding slot on drop, on every exit path of a retrieval.
#[must_use = "the slot is released when the guard is dropped"]
pub(crate) struct Release<'a> {
    admission: &'a Admission,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.admission.release_one();
    }
}
