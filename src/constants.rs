//! Centralized topology and configuration constants.
//!
//! # Categories
//!
//! - **Topology Constants**: versions and ids with special meaning
//! - **Configuration Defaults**: values used when nothing is configured
//! - **Retry Constants**: backoff for operations applied by the execution driver

use std::time::Duration;

// =============================================================================
// Topology Constants
// =============================================================================

/// Version of a topology that was never initialized.
pub const UNINITIALIZED_VERSION: i64 = -1;

/// Version of a freshly initialized topology.
pub const INITIAL_VERSION: i64 = 0;

/// Change id reported when no change has ever completed.
pub const NO_CHANGE_ID: u64 = 0;

/// Minimum number of replicas a partition must keep when a member leaves it.
pub const MIN_REPLICAS_AFTER_LEAVE: usize = 1;

// =============================================================================
// Configuration Defaults
// =============================================================================

/// Default number of members in a statically configured cluster.
pub const DEFAULT_CLUSTER_SIZE: u32 = 3;

/// Default number of partitions.
pub const DEFAULT_PARTITION_COUNT: u32 = 3;

/// Default replication factor.
pub const DEFAULT_REPLICATION_FACTOR: u32 = 3;

// =============================================================================
// Retry Constants
// =============================================================================

/// Initial delay before retrying a failed operation.
pub const DEFAULT_OPERATION_RETRY_MIN_DELAY: Duration = Duration::from_millis(100);

/// Upper bound for the delay between operation retries.
pub const DEFAULT_OPERATION_RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Number of retries before an operation failure is surfaced.
pub const DEFAULT_OPERATION_RETRY_MAX_TIMES: usize = 5;
