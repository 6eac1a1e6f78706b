//! Configuration types for fetch-pool

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
///
/// Groups the task pool settings and the settings of the default HTTP executor.
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task pool sizing, admission and shutdown behavior
    #[serde(default)]
    pub pool: PoolConfig,

    /// HTTP fetching and artifact persistence
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section for values that cannot work
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.fetch.validate()
    }
}

/// How the pool treats submissions once `max_outstanding` is reached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// The cap is a contract for the driver; the pool still accepts work past it
    #[default]
    Advisory,
    /// `submit` fails fast with [`Error::AtCapacity`] when the cap is reached
    Enforced,
}

/// Task pool configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of workers executing items concurrently (default: 20)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum number of submitted-but-not-retrieved tasks (default: 200)
    #[serde(default = "default_max_outstanding")]
    pub max_outstanding: usize,

    /// Admission policy at the cap (default: advisory)
    #[serde(default)]
    pub admission: AdmissionPolicy,

    /// Upper bound on a single execution (None = unbounded)
    #[serde(default, with = "optional_duration_serde")]
    pub task_timeout: Option<Duration>,

    /// Grace period used by the batch driver when shutting the pool down (default: 10 seconds)
    #[serde(default = "default_shutdown_grace", with = "duration_serde")]
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_outstanding: default_max_outstanding(),
            admission: AdmissionPolicy::default(),
            task_timeout: None,
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

impl PoolConfig {
    /// Pool configuration with explicit sizing and defaults for everything else
    pub fn new(workers: usize, max_outstanding: usize) -> Self {
        Self {
            workers,
            max_outstanding,
            ..Default::default()
        }
    }

    /// Reject sizes the pool cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("workers", "must be at least 1"));
        }
        if self.max_outstanding == 0 {
            return Err(Error::config("max_outstanding", "must be at least 1"));
        }
        if self.task_timeout == Some(Duration::ZERO) {
            return Err(Error::config(
                "task_timeout",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }
}

/// How to handle an artifact path that already exists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Keep the existing file and fail the item
    Skip,
    /// Write next to it as `name (1).ext`, `name (2).ext`, ...
    Rename,
}

/// Thumbnail (derived artifact) settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Maximum thumbnail width in pixels (default: 100)
    #[serde(default = "default_thumbnail_side")]
    pub max_width: u32,

    /// Maximum thumbnail height in pixels (default: 100)
    #[serde(default = "default_thumbnail_side")]
    pub max_height: u32,

    /// JPEG quality 1-100 (default: 85)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_width: default_thumbnail_side(),
            max_height: default_thumbnail_side(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Settings for the HTTP executor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Total time allowed for one request including the body (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Time allowed to establish a connection (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Redirect hops allowed for items that follow redirects (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Largest response body accepted, in bytes (default: 50 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Derived artifact settings
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,

    /// Existing-file handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Retry policy for transient fetch failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
            thumbnail: ThumbnailConfig::default(),
            file_collision: FileCollisionAction::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Reject settings the executor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.thumbnail.max_width == 0 || self.thumbnail.max_height == 0 {
            return Err(Error::config(
                "thumbnail",
                "thumbnail dimensions must be non-zero",
            ));
        }
        if !(1..=100).contains(&self.thumbnail.jpeg_quality) {
            return Err(Error::config(
                "thumbnail.jpeg_quality",
                "must be between 1 and 100",
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::config("max_body_bytes", "must be at least 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "must be at least 1.0",
            ));
        }
        Ok(())
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 0)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

// Default value functions
fn default_workers() -> usize {
    20
}

fn default_max_outstanding() -> usize {
    // ten pending tasks per worker
    200
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(10)
}

fn default_thumbnail_side() -> u32 {
    100
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_body_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_user_agent() -> String {
    format!("fetch-pool/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Durations are written as seconds: whole numbers when exact, fractions otherwise
mod duration_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Secs(#[serde(with = "super::duration_serde")] Duration);

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&Secs(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<Secs>::deserialize(deserializer)?;
        Ok(secs.map(|Secs(d)| d))
    }
}
