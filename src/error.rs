//! Crate & response level error codes.
//!
//! # Error Hierarchy
//!
//! The crate uses a two-layer error hierarchy:
//!
//! ## Response Layer (`crate::error`)
//!
//! - [`ErrorCode`]: the coarse code attached to a failed management response,
//!   telling a client whether its request was invalid or whether it should try
//!   again later.
//!
//! ## Cluster Layer (`crate::cluster::error`)
//!
//! - [`TopologyError`]: detailed errors produced by transformers, appliers,
//!   the coordinator and the execution driver.
//! - Has `error_code()` for mapping to [`ErrorCode`].
//!
//! [`TopologyError`]: crate::cluster::TopologyError

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code reported to callers of the topology management API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The request failed validation or simulation. Nothing was changed.
    InvalidRequest,
    /// A structural precondition does not hold, e.g. the topology is not
    /// initialized yet.
    OperationNotAllowed,
    /// Another change is in flight or the topology changed underneath the
    /// request. Retry against the current topology.
    ConcurrentModification,
    /// Unexpected failure, including requests sent to a member that is not
    /// the coordinator.
    InternalError,
}

impl ErrorCode {
    /// Returns the wire name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            ErrorCode::ConcurrentModification => "CONCURRENT_MODIFICATION",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller may succeed by retrying the same request.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ErrorCode::ConcurrentModification)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
