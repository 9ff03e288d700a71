//! Change plans and the history record of finished changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::operations::TopologyChangeOperation;
use crate::types::ChangeId;

/// Status of a topology change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    InProgress,
    Completed,
    /// Part of the encoded status set. Plans with a failing operation stay
    /// `InProgress` until retried or cancelled, so this is only ever decoded.
    Failed,
    Cancelled,
}

/// An operation that has been applied, with the time it completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedOperation {
    pub operation: TopologyChangeOperation,
    pub completed_at: DateTime<Utc>,
}

/// A change in progress.
///
/// The operation list is fixed when the plan is created. Operations only
/// move from the head of `pending_operations` to the tail of
/// `completed_operations`; they are never reordered, inserted or removed
/// except by cancelling the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterChangePlan {
    pub id: ChangeId,
    pub version: i64,
    pub status: ChangeStatus,
    pub started_at: DateTime<Utc>,
    pub completed_operations: Vec<CompletedOperation>,
    pub pending_operations: Vec<TopologyChangeOperation>,
}

impl ClusterChangePlan {
    pub fn init(id: ChangeId, operations: Vec<TopologyChangeOperation>) -> Self {
        Self {
            id,
            version: 1,
            status: ChangeStatus::InProgress,
            started_at: Utc::now(),
            completed_operations: Vec::new(),
            pending_operations: operations,
        }
    }

    /// Move the head operation to the completed list.
    pub fn advance(mut self) -> Self {
        if !self.pending_operations.is_empty() {
            let operation = self.pending_operations.remove(0);
            self.completed_operations.push(CompletedOperation {
                operation,
                completed_at: Utc::now(),
            });
            self.version += 1;
        }
        self
    }

    pub fn has_pending_operations(&self) -> bool {
        !self.pending_operations.is_empty()
    }

    pub fn next_pending_operation(&self) -> Option<&TopologyChangeOperation> {
        self.pending_operations.first()
    }

    /// Close this plan with the given status.
    pub fn finish(self, status: ChangeStatus) -> CompletedChange {
        CompletedChange {
            id: self.id,
            status,
            started_at: self.started_at,
            completed_at: Utc::now(),
            operations: self.completed_operations,
        }
    }
}

/// Record of the most recently finished change.
///
/// `operations` holds every operation that was actually applied: all of them
/// for a completed change, the completed prefix for a cancelled one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedChange {
    pub id: ChangeId,
    pub status: ChangeStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub operations: Vec<CompletedOperation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops() -> Vec<TopologyChangeOperation> {
        vec![
            TopologyChangeOperation::member_join(4),
            TopologyChangeOperation::member_join(5),
        ]
    }

    #[test]
    fn test_advance_moves_head_in_order() {
        let plan = ClusterChangePlan::init(1, ops()).advance();
        assert_eq!(plan.completed_operations.len(), 1);
        assert_eq!(
            plan.completed_operations[0].operation,
            TopologyChangeOperation::member_join(4)
        );
        assert_eq!(
            plan.next_pending_operation(),
            Some(&TopologyChangeOperation::member_join(5))
        );

        let plan = plan.advance();
        assert!(!plan.has_pending_operations());
        // advancing an empty plan is a no-op
        assert_eq!(plan.clone().advance(), plan);
    }

    #[test]
    fn test_finish_keeps_completed_prefix() {
        let change = ClusterChangePlan::init(7, ops())
            .advance()
            .finish(ChangeStatus::Cancelled);
        assert_eq!(change.id, 7);
        assert_eq!(change.status, ChangeStatus::Cancelled);
        assert_eq!(change.operations.len(), 1);
    }
}
