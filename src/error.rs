//! Error types for fetch-pool
//!
//! Two layers of errors exist in this crate:
//! - [`Error`] is returned synchronously by pool and library operations
//!   (configuration, submission after shutdown, retrieval with nothing pending, ...)
//! - [`TaskError`] describes why a single work item failed. It never escapes the pool
//!   as an `Error`; it travels inside the [`WorkResult`](crate::types::WorkResult)
//!   delivered to whoever retrieves it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for fetch-pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fetch-pool
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// A work item could not be constructed
    #[error("invalid work item: {0}")]
    InvalidItem(String),

    /// A line of an input list could not be parsed
    #[error("invalid input at line {line}: {reason}")]
    InvalidInput {
        /// 1-based line number in the input
        line: usize,
        /// Why the line was rejected
        reason: String,
    },

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,

    /// Submission refused because the outstanding cap is reached (enforced admission only)
    #[error("admission refused: {limit} tasks already outstanding")]
    AtCapacity {
        /// The configured maximum number of outstanding tasks
        limit: usize,
    },

    /// Retrieval attempted while no submitted task is awaiting retrieval
    #[error("no pending work: every submitted task has already been retrieved")]
    NoPendingWork,

    /// The pool terminated while results were still owed
    #[error("pool terminated with {abandoned} task(s) that will never produce a result")]
    Terminated {
        /// Number of outstanding tasks that were abandoned by forced termination
        abandoned: usize,
    },

    /// Worker tasks exited abnormally (outside of any executor call)
    #[error("{count} worker(s) exited abnormally")]
    WorkerLost {
        /// Number of workers that panicked or were otherwise lost
        count: usize,
    },

    /// The pool was constructed outside of a Tokio runtime
    #[error("no Tokio runtime available to spawn workers: {0}")]
    NoRuntime(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Classification of a failed work item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// Connection failure, transport error or server-side unavailability
    Network,
    /// The fetch or the whole execution exceeded its time budget
    Timeout,
    /// The remote answered, but not with something usable
    InvalidResponse,
    /// Writing the artifact to the local filesystem failed
    Io,
    /// The executor panicked while handling the item
    Panicked,
}

impl std::fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskErrorKind::Network => "network error",
            TaskErrorKind::Timeout => "timeout",
            TaskErrorKind::InvalidResponse => "invalid response",
            TaskErrorKind::Io => "I/O error",
            TaskErrorKind::Panicked => "executor panicked",
        };
        f.write_str(s)
    }
}

/// Failure outcome of a single work item
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TaskError {
    /// What class of failure occurred
    pub kind: TaskErrorKind,
    /// Human-readable description
    pub message: String,
}

impl TaskError {
    /// Create a task error of the given kind
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Network-class failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Network, message)
    }

    /// Timeout failure
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Timeout, message)
    }

    /// Unusable response
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::InvalidResponse, message)
    }

    /// Local filesystem failure
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Io, message)
    }

    /// Executor panic
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Panicked, message)
    }
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            TaskError::timeout(e.to_string())
        } else {
            TaskError::io(e.to_string())
        }
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TaskError::timeout(format!("request timed out: {}", e))
        } else if e.is_connect() {
            TaskError::network(format!("connection failed: {}", e))
        } else if e.is_decode() || e.is_redirect() {
            TaskError::invalid_response(e.to_string())
        } else {
            TaskError::network(e.to_string())
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_error_display_includes_kind_and_message() {
        let err = TaskError::invalid_response("HTTP 404 Not Found");
        assert_eq!(err.to_string(), "invalid response: HTTP 404 Not Found");
    }

    #[test]
    fn io_timed_out_maps_to_timeout_kind() {
        let err: TaskError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk").into();
        assert_eq!(err.kind, TaskErrorKind::Timeout);
    }

    #[test]
    fn io_permission_denied_maps_to_io_kind() {
        let err: TaskError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();
        assert_eq!(err.kind, TaskErrorKind::Io);
        assert!(err.message.contains("read-only"));
    }

    #[test]
    fn config_helper_records_key() {
        match Error::config("workers", "must be at least 1") {
            Error::Config { message, key } => {
                assert_eq!(message, "must be at least 1");
                assert_eq!(key.as_deref(), Some("workers"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn task_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TaskErrorKind::InvalidResponse).unwrap();
        assert_eq!(json, "\"invalid_response\"");
    }

    #[test]
    fn terminated_error_mentions_abandoned_count() {
        let err = Error::Terminated { abandoned: 3 };
        assert!(err.to_string().contains("3 task(s)"));
    }
}
