//! Core types for fetch-pool

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result, TaskError};

/// Per-item behavior switches
///
/// By default only the thumbnail is kept and redirects are not followed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorFlags {
    /// Persist the fetched bytes as-is
    pub save_original: bool,
    /// Persist a derived, smaller artifact (a thumbnail for the HTTP executor)
    pub save_derived: bool,
    /// Follow HTTP redirects instead of treating them as failures
    pub follow_redirects: bool,
}

impl Default for BehaviorFlags {
    fn default() -> Self {
        Self {
            save_original: false,
            save_derived: true,
            follow_redirects: false,
        }
    }
}

/// One unit of work: where to fetch from, what to call it, where to put it
///
/// Fields are private; a `WorkItem` is immutable once built and is moved into the pool on
/// submission. Deserialization goes through [`WorkItem::new`], so the id checks apply there too.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWorkItem")]
pub struct WorkItem {
    id: String,
    source: String,
    output_dir: PathBuf,
    flags: BehaviorFlags,
}

impl WorkItem {
    /// Create a work item with default [`BehaviorFlags`]
    ///
    /// The id names the produced files, so it must be non-empty and free of path separators.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidItem("id must not be empty".to_string()));
        }
        if id.contains('/') || id.contains('\\') || id == "." || id == ".." {
            return Err(Error::InvalidItem(format!(
                "id '{}' must not contain path components",
                id
            )));
        }
        Ok(Self {
            id,
            source: source.into(),
            output_dir: output_dir.into(),
            flags: BehaviorFlags::default(),
        })
    }

    /// Replace the behavior flags (consumes and returns the item, before submission)
    pub fn with_flags(mut self, flags: BehaviorFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Logical id of the item
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Source address (a URL for the HTTP executor)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Directory receiving the item's artifacts
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Behavior flags
    pub fn flags(&self) -> BehaviorFlags {
        self.flags
    }
}

/// Unchecked wire form of [`WorkItem`]
#[derive(Deserialize)]
struct RawWorkItem {
    id: String,
    source: String,
    output_dir: PathBuf,
    #[serde(default)]
    flags: BehaviorFlags,
}

impl TryFrom<RawWorkItem> for WorkItem {
    type Error = Error;

    fn try_from(raw: RawWorkItem) -> Result<Self> {
        Ok(WorkItem::new(raw.id, raw.source, raw.output_dir)?.with_flags(raw.flags))
    }
}

/// What a successful execution left behind
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path of the saved original, if one was written
    pub original: Option<PathBuf>,
    /// Path of the derived artifact, if one was written
    pub derived: Option<PathBuf>,
    /// Size of the fetched payload in bytes
    pub bytes: u64,
}

/// Result of executing one [`WorkItem`]
///
/// Exactly one is produced per accepted item. A failed execution is still a `WorkResult`;
/// its `outcome` carries the [`TaskError`].
#[derive(Clone, Debug, Serialize)]
pub struct WorkResult {
    /// Logical id of the item this result belongs to
    pub id: String,
    /// Artifact on success, classified failure otherwise
    pub outcome: std::result::Result<Artifact, TaskError>,
    /// Index of the worker that ran the item
    pub worker: usize,
    /// Wall-clock execution time
    pub elapsed: Duration,
    /// When the result was published
    pub completed_at: DateTime<Utc>,
}

impl WorkResult {
    /// Whether the item succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&TaskError> {
        self.outcome.as_ref().err()
    }

    /// The artifact, if any
    pub fn artifact(&self) -> Option<&Artifact> {
        self.outcome.as_ref().ok()
    }
}

/// Pool lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Accepting submissions
    Running,
    /// Shutdown requested; draining queued and in-flight work
    ShuttingDown,
    /// All workers have stopped
    Terminated,
}

impl Lifecycle {
    /// Convert the atomic representation back to the enum
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::Running,
            1 => Lifecycle::ShuttingDown,
            _ => Lifecycle::Terminated,
        }
    }

    /// Atomic representation
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Lifecycle::Running => 0,
            Lifecycle::ShuttingDown => 1,
            Lifecycle::Terminated => 2,
        }
    }
}

/// Point-in-time view of a pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Number of workers
    pub workers: usize,
    /// Submitted but not yet retrieved
    pub outstanding: usize,
    /// Admission threshold
    pub max_outstanding: usize,
    /// Items waiting in the work queue (not yet picked up by a worker)
    pub queued: usize,
    /// Total accepted submissions
    pub submitted: u64,
    /// Total results published by workers
    pub published: u64,
    /// Current lifecycle state
    pub lifecycle: Lifecycle,
}

/// Outcome of [`TaskPool::shutdown`](crate::pool::TaskPool::shutdown)
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Whether every worker finished within the grace period
    pub drained: bool,
    /// Workers that had to be cancelled after the grace period
    pub forced_workers: usize,
    /// Results published over the pool's lifetime
    pub published: u64,
    /// Accepted items that will never produce a result
    pub abandoned: u64,
    /// Time spent inside the shutdown call
    pub elapsed: Duration,
}
