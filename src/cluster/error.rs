//! Error types for the topology coordination engine.
//!
//! # Error Handling Patterns
//!
//! Every validation failure is detected before any external executor is
//! invoked: request transformers reject malformed intents, and the coordinator
//! simulates the whole operation list against a copy of the topology. A
//! request that fails either step is reported as [`TopologyError::InvalidRequest`]
//! and has not mutated anything.
//!
//! Once a change plan is committed, the only failures left are genuine
//! execution failures of an already validated operation
//! ([`TopologyError::ExecutionFailed`]). These are surfaced to the execution
//! driver and the operator; the plan stays pending with its completed prefix
//! intact and is never rolled back automatically.
//!
//! ## Guidelines
//!
//! - **Transformers and appliers**: return `InvalidRequest` for bad input,
//!   `OperationNotAllowed` for structural preconditions (uninitialized topology)
//! - **Coordinator**: `ConcurrentModification` whenever the caller should retry
//!   against the current topology
//! - **Unexpected states**: `Internal`, including "not the coordinator"

use thiserror::Error;

use crate::error::ErrorCode;

/// Result type for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that can occur while planning, validating or applying a topology change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// The request failed transformer validation or simulation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Another change is pending, or the topology changed between validation
    /// and commit.
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// A structural precondition is violated.
    #[error("Operation not allowed: {0}")]
    OperationNotAllowed(String),

    /// Unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// An operation variant with no registered applier.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// The external executor failed to carry out a validated operation.
    #[error("Failed to apply operation {operation}: {reason}")]
    ExecutionFailed { operation: String, reason: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TopologyError {
    /// Shorthand for an [`TopologyError::InvalidRequest`] error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        TopologyError::InvalidRequest(msg.into())
    }

    /// Shorthand for an [`TopologyError::ExecutionFailed`] error.
    pub fn execution_failed(operation: impl ToString, reason: impl Into<String>) -> Self {
        TopologyError::ExecutionFailed {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Map to the response-level error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            TopologyError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            TopologyError::UnknownOperation(_) => ErrorCode::InvalidRequest,
            TopologyError::Config(_) => ErrorCode::InvalidRequest,
            TopologyError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            TopologyError::OperationNotAllowed(_) => ErrorCode::OperationNotAllowed,
            TopologyError::Internal(_) => ErrorCode::InternalError,
            TopologyError::ExecutionFailed { .. } => ErrorCode::InternalError,
        }
    }

    /// Check if this error is transient.
    ///
    /// Concurrent modifications succeed once the caller retries against the
    /// current topology. Execution failures come from external executors and
    /// are retried by the driver.
    pub fn is_retriable(&self) -> bool {
        match self {
            TopologyError::ConcurrentModification(_) => true,
            TopologyError::ExecutionFailed { .. } => true,

            TopologyError::InvalidRequest(_) => false,
            TopologyError::OperationNotAllowed(_) => false,
            TopologyError::Internal(_) => false,
            TopologyError::UnknownOperation(_) => false,
            TopologyError::Config(_) => false,
        }
    }

    /// Wrap this error as an invalid request, keeping the original message.
    ///
    /// Used by simulation: whatever goes wrong while dry-running a plan means
    /// the request cannot be applied.
    pub fn into_invalid_request(self) -> Self {
        match self {
            TopologyError::InvalidRequest(_) => self,
            other => TopologyError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for TopologyError {
    fn from(e: serde_json::Error) -> Self {
        TopologyError::Internal(format!("serialization failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TopologyError::invalid("x").error_code(),
            ErrorCode::InvalidRequest
        );
        assert_eq!(
            TopologyError::ConcurrentModification("x".into()).error_code(),
            ErrorCode::ConcurrentModification
        );
        assert_eq!(
            TopologyError::OperationNotAllowed("x".into()).error_code(),
            ErrorCode::OperationNotAllowed
        );
        assert_eq!(
            TopologyError::Internal("x".into()).error_code(),
            ErrorCode::InternalError
        );
    }

    #[test]
    fn test_into_invalid_request_keeps_message() {
        let err = TopologyError::UnknownOperation("Unrecognized".into()).into_invalid_request();
        match err {
            TopologyError::InvalidRequest(msg) => assert!(msg.contains("Unrecognized")),
            other => panic!("unexpected error {other:?}"),
        }

        let already = TopologyError::invalid("bad").into_invalid_request();
        assert_eq!(already, TopologyError::invalid("bad"));
    }

    #[test]
    fn test_retriable_classification() {
        assert!(TopologyError::ConcurrentModification("x".into()).is_retriable());
        assert!(TopologyError::execution_failed("op", "timeout").is_retriable());
        assert!(!TopologyError::invalid("x").is_retriable());
        assert!(!TopologyError::UnknownOperation("x".into()).is_retriable());
    }
}
