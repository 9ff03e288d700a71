//! Retry policies for applying topology change operations.
//!
//! Executor calls made by the execution driver hit real infrastructure
//! (raft groups, membership) and can fail transiently. They are retried with
//! an exponential backoff built on the `backon` crate before the failure is
//! surfaced and the plan is left pending.
//!
//! | Policy | Min Delay | Max Delay | Retries | Use Case |
//! |--------|-----------|-----------|---------|----------|
//! | `operation_policy` | 100ms | 10s | 5 | Applying an operation |
//! | `fast_policy` | 5ms | 100ms | 3 | Tests and local executors |
//!
//! # Example
//!
//! ```rust,no_run
//! use cluster_topology::cluster::retry;
//! use backon::Retryable;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = (|| async {
//!         // your fallible operation
//!         Ok::<_, std::io::Error>(())
//!     })
//!     .retry(retry::operation_policy())
//!     .when(|e| e.kind() == std::io::ErrorKind::TimedOut)
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use backon::ExponentialBuilder;

use super::config::TopologyConfig;
use crate::constants::{
    DEFAULT_OPERATION_RETRY_MAX_DELAY, DEFAULT_OPERATION_RETRY_MAX_TIMES,
    DEFAULT_OPERATION_RETRY_MIN_DELAY,
};

/// Policy for applying an operation against real executors.
pub fn operation_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(DEFAULT_OPERATION_RETRY_MIN_DELAY)
        .with_max_delay(DEFAULT_OPERATION_RETRY_MAX_DELAY)
        .with_max_times(DEFAULT_OPERATION_RETRY_MAX_TIMES)
        .with_jitter()
}

/// [`operation_policy`] with the delays and retry count of `config`.
pub fn operation_policy_from(config: &TopologyConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(config.operation_retry_min_delay)
        .with_max_delay(config.operation_retry_max_delay)
        .with_max_times(config.operation_retry_max_times)
        .with_jitter()
}

/// Policy with minimal delays.
pub fn fast_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(100))
        .with_max_times(3)
        .with_jitter()
}

/// Log a retry attempt.
pub fn record_retry_attempt(policy_name: &str, error: &dyn std::fmt::Display, delay: Duration) {
    tracing::debug!(policy = policy_name, error = %error, ?delay, "Retry attempt");
}
