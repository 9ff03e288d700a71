//! Operation appliers.
//!
//! Every [`TopologyChangeOperation`] is applied in two phases:
//!
//! 1. `init`: synchronous validation against the current topology. Returns a
//!    transformer that pre-marks the topology (e.g. member `Leaving`).
//! 2. `apply`: the asynchronous external action (join a raft group, remove a
//!    broker). Returns a transformer that post-marks the topology
//!    (e.g. member `Left`).
//!
//! `init` always runs before `apply`, and no other operation of the same
//! plan runs between them, so the topology `apply`'s transformer sees is the
//! one `init`'s transformer produced.
//!
//! # Applier Shapes
//!
//! ```text
//! MemberOperationApplier  ── blanket impl ──▶  OperationApplier
//!   (state of one member)                       (whole topology)
//!
//! PartitionForceReconfigureApplier ─────────▶  OperationApplier
//!   (strips the partition from several members at once)
//! ```
//!
//! Dispatch is an exhaustive `match` over the operation enum; a new variant
//! without an applier does not compile. Operations this member cannot
//! interpret ([`TopologyChangeOperation::Unrecognized`]) get a
//! [`FailingApplier`].

mod force;
mod member;
mod partition;

use async_trait::async_trait;
use std::sync::Arc;

use super::error::{TopologyError, TopologyResult};
use super::executor::{NoopMembershipChangeExecutor, NoopPartitionChangeExecutor};
use super::operations::TopologyChangeOperation;
use super::state::{ClusterTopology, MemberState};
use super::traits::{PartitionChangeExecutor, TopologyMembershipChangeExecutor};
use crate::types::MemberId;

pub use force::PartitionForceReconfigureApplier;
pub use member::{MemberJoinApplier, MemberLeaveApplier, MemberRemoveApplier};
pub use partition::{
    PartitionJoinApplier, PartitionLeaveApplier, PartitionReconfigurePriorityApplier,
};

/// Pure transformation of the whole topology.
pub type TopologyTransformer = Box<dyn FnOnce(ClusterTopology) -> ClusterTopology + Send>;

/// Pure transformation of a single member's state.
pub type MemberStateTransformer = Box<dyn FnOnce(MemberState) -> MemberState + Send>;

/// Applier operating on the whole topology.
#[async_trait]
pub trait OperationApplier: Send + Sync {
    /// Validate the operation and return the pre-mark transformer.
    fn init(&mut self, topology: &ClusterTopology) -> TopologyResult<TopologyTransformer>;

    /// Execute the operation and return the post-mark transformer.
    async fn apply(&self) -> TopologyResult<TopologyTransformer>;
}

/// Applier whose effects are confined to one member's state.
#[async_trait]
pub trait MemberOperationApplier: Send + Sync {
    /// The member whose state this applier changes.
    fn member_id(&self) -> &MemberId;

    fn init_member_state(
        &mut self,
        topology: &ClusterTopology,
    ) -> TopologyResult<MemberStateTransformer>;

    async fn apply_operation(&self) -> TopologyResult<MemberStateTransformer>;
}

#[async_trait]
impl<A: MemberOperationApplier> OperationApplier for A {
    fn init(&mut self, topology: &ClusterTopology) -> TopologyResult<TopologyTransformer> {
        let member_id = self.member_id().clone();
        let transformer = self.init_member_state(topology)?;
        Ok(Box::new(move |topology: ClusterTopology| {
            topology.update_member(&member_id, transformer)
        }))
    }

    async fn apply(&self) -> TopologyResult<TopologyTransformer> {
        let member_id = self.member_id().clone();
        let transformer = self.apply_operation().await?;
        Ok(Box::new(move |topology: ClusterTopology| {
            topology.update_member(&member_id, transformer)
        }))
    }
}

/// Applier for operations that cannot be applied. Fails both phases.
#[derive(Debug, Clone)]
pub struct FailingApplier {
    operation: TopologyChangeOperation,
}

impl FailingApplier {
    pub fn new(operation: TopologyChangeOperation) -> Self {
        Self { operation }
    }

    fn error(&self) -> TopologyError {
        TopologyError::UnknownOperation(format!(
            "No applier is registered for operation {}",
            self.operation
        ))
    }
}

#[async_trait]
impl OperationApplier for FailingApplier {
    fn init(&mut self, _topology: &ClusterTopology) -> TopologyResult<TopologyTransformer> {
        Err(self.error())
    }

    async fn apply(&self) -> TopologyResult<TopologyTransformer> {
        Err(self.error())
    }
}

/// Resolves the applier for an operation.
pub trait TopologyChangeAppliers: Send + Sync {
    fn get_applier(&self, operation: &TopologyChangeOperation) -> Box<dyn OperationApplier>;
}

/// Appliers backed by a pair of executors.
#[derive(Clone)]
pub struct TopologyChangeAppliersImpl {
    partition_executor: Arc<dyn PartitionChangeExecutor>,
    membership_executor: Arc<dyn TopologyMembershipChangeExecutor>,
}

impl TopologyChangeAppliersImpl {
    pub fn new(
        partition_executor: Arc<dyn PartitionChangeExecutor>,
        membership_executor: Arc<dyn TopologyMembershipChangeExecutor>,
    ) -> Self {
        Self {
            partition_executor,
            membership_executor,
        }
    }

    /// Appliers that validate but never touch real infrastructure.
    pub fn simulation() -> Self {
        Self::new(
            Arc::new(NoopPartitionChangeExecutor),
            Arc::new(NoopMembershipChangeExecutor),
        )
    }
}

impl TopologyChangeAppliers for TopologyChangeAppliersImpl {
    fn get_applier(&self, operation: &TopologyChangeOperation) -> Box<dyn OperationApplier> {
        match operation {
            TopologyChangeOperation::MemberJoin { member_id } => Box::new(MemberJoinApplier::new(
                member_id.clone(),
                self.membership_executor.clone(),
            )),
            TopologyChangeOperation::MemberLeave { member_id } => Box::new(
                MemberLeaveApplier::new(member_id.clone(), self.membership_executor.clone()),
            ),
            TopologyChangeOperation::MemberRemove {
                member_id,
                member_to_remove,
            } => Box::new(MemberRemoveApplier::new(
                member_id.clone(),
                member_to_remove.clone(),
                self.membership_executor.clone(),
            )),
            TopologyChangeOperation::PartitionJoin {
                member_id,
                partition_id,
                priority,
            } => Box::new(PartitionJoinApplier::new(
                member_id.clone(),
                *partition_id,
                *priority,
                self.partition_executor.clone(),
            )),
            TopologyChangeOperation::PartitionLeave {
                member_id,
                partition_id,
            } => Box::new(PartitionLeaveApplier::new(
                member_id.clone(),
                *partition_id,
                self.partition_executor.clone(),
            )),
            TopologyChangeOperation::PartitionReconfigurePriority {
                member_id,
                partition_id,
                priority,
            } => Box::new(PartitionReconfigurePriorityApplier::new(
                member_id.clone(),
                *partition_id,
                *priority,
                self.partition_executor.clone(),
            )),
            TopologyChangeOperation::PartitionForceReconfigure {
                member_id,
                partition_id,
                members,
            } => Box::new(PartitionForceReconfigureApplier::new(
                member_id.clone(),
                *partition_id,
                members.clone(),
                self.partition_executor.clone(),
            )),
            TopologyChangeOperation::Unrecognized => {
                Box::new(FailingApplier::new(operation.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unrecognized_operation_gets_failing_applier() {
        let appliers = TopologyChangeAppliersImpl::simulation();
        let mut applier = appliers.get_applier(&TopologyChangeOperation::Unrecognized);

        let init = applier.init(&ClusterTopology::init());
        assert!(matches!(init, Err(TopologyError::UnknownOperation(_))));

        let apply = applier.apply().await;
        assert!(matches!(apply, Err(TopologyError::UnknownOperation(_))));
    }

    #[tokio::test]
    async fn test_member_applier_composes_with_update_member() {
        let appliers = TopologyChangeAppliersImpl::simulation();
        let mut applier = appliers.get_applier(&TopologyChangeOperation::member_join(4));

        let topology = ClusterTopology::init();
        let topology = (applier.init(&topology).unwrap())(topology);
        let topology = (applier.apply().await.unwrap())(topology);

        assert!(topology.get_member(&MemberId::from(4)).unwrap().is_active());
    }
}
