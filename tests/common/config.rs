//! Test configurations

use fetch_pool::config::RetryConfig;
use fetch_pool::{FetchConfig, PoolConfig};
use std::time::Duration;

/// Fetch settings with short timeouts so failing tests fail fast
pub fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

/// Retry quickly, without jitter
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

/// Small pool for integration tests
pub fn small_pool_config() -> PoolConfig {
    PoolConfig {
        shutdown_grace: Duration::from_secs(5),
        ..PoolConfig::new(4, 8)
    }
}
