//! Appliers for member join, leave and remove.

use async_trait::async_trait;
use std::sync::Arc;

use super::{MemberOperationApplier, MemberStateTransformer};
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::{ClusterTopology, MemberState, MemberStatus};
use crate::cluster::traits::TopologyMembershipChangeExecutor;
use crate::types::MemberId;

fn partitions_of(member: &MemberState) -> String {
    member
        .partitions
        .keys()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Adds a new member. Pre-marks it `Joining`, marks it `Active` once the
/// membership layer accepted it.
pub struct MemberJoinApplier {
    member_id: MemberId,
    executor: Arc<dyn TopologyMembershipChangeExecutor>,
}

impl MemberJoinApplier {
    pub fn new(member_id: MemberId, executor: Arc<dyn TopologyMembershipChangeExecutor>) -> Self {
        Self {
            member_id,
            executor,
        }
    }
}

#[async_trait]
impl MemberOperationApplier for MemberJoinApplier {
    fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    fn init_member_state(
        &mut self,
        topology: &ClusterTopology,
    ) -> TopologyResult<MemberStateTransformer> {
        match topology.get_member(&self.member_id) {
            // A retried join after a crash finds the member already joining.
            None => {}
            Some(member) if member.status == MemberStatus::Joining => {}
            Some(member) => {
                return Err(TopologyError::invalid(format!(
                    "Expected to join member {}, but the member is already part of the topology with state {:?}",
                    self.member_id, member.status
                )));
            }
        }
        Ok(Box::new(|member: MemberState| member.to_joining()))
    }

    async fn apply_operation(&self) -> TopologyResult<MemberStateTransformer> {
        self.executor
            .add_broker(&self.member_id)
            .await
            .map_err(|reason| {
                TopologyError::execution_failed(
                    TopologyChangeOperation::member_join(self.member_id.clone()),
                    reason,
                )
            })?;
        Ok(Box::new(|member: MemberState| member.to_active()))
    }
}

/// Validates that `member_id` can go away: it must exist and replicate no
/// partitions. Shared by leave and remove.
fn validate_can_leave(
    topology: &ClusterTopology,
    member_id: &MemberId,
    action: &str,
) -> TopologyResult<()> {
    let member = topology.get_member(member_id).ok_or_else(|| {
        TopologyError::invalid(format!(
            "Expected to {} member {}, but the member is not part of the topology",
            action, member_id
        ))
    })?;

    if !member.partitions.is_empty() {
        return Err(TopologyError::invalid(format!(
            "Expected to {} member {}, but the member still replicates partitions [{}]. Reassign its partitions first",
            action,
            member_id,
            partitions_of(member)
        )));
    }
    Ok(())
}

/// A member leaving on its own. The leave path never evacuates partitions;
/// that has to be done by a reassignment first.
pub struct MemberLeaveApplier {
    member_id: MemberId,
    executor: Arc<dyn TopologyMembershipChangeExecutor>,
}

impl MemberLeaveApplier {
    pub fn new(member_id: MemberId, executor: Arc<dyn TopologyMembershipChangeExecutor>) -> Self {
        Self {
            member_id,
            executor,
        }
    }
}

#[async_trait]
impl MemberOperationApplier for MemberLeaveApplier {
    fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    fn init_member_state(
        &mut self,
        topology: &ClusterTopology,
    ) -> TopologyResult<MemberStateTransformer> {
        validate_can_leave(topology, &self.member_id, "leave")?;

        let status = topology
            .get_member(&self.member_id)
            .map(|member| member.status);
        match status {
            Some(MemberStatus::Active) | Some(MemberStatus::Leaving) => {
                Ok(Box::new(|member: MemberState| member.to_leaving()))
            }
            other => Err(TopologyError::invalid(format!(
                "Expected to leave member {}, but the member is in state {:?}",
                self.member_id, other
            ))),
        }
    }

    async fn apply_operation(&self) -> TopologyResult<MemberStateTransformer> {
        self.executor
            .remove_broker(&self.member_id)
            .await
            .map_err(|reason| {
                TopologyError::execution_failed(
                    TopologyChangeOperation::member_leave(self.member_id.clone()),
                    reason,
                )
            })?;
        Ok(Box::new(|member: MemberState| member.to_left()))
    }
}

/// The coordinator removing another, possibly unreachable, member.
pub struct MemberRemoveApplier {
    coordinator: MemberId,
    member_to_remove: MemberId,
    executor: Arc<dyn TopologyMembershipChangeExecutor>,
}

impl MemberRemoveApplier {
    pub fn new(
        coordinator: MemberId,
        member_to_remove: MemberId,
        executor: Arc<dyn TopologyMembershipChangeExecutor>,
    ) -> Self {
        Self {
            coordinator,
            member_to_remove,
            executor,
        }
    }
}

#[async_trait]
impl MemberOperationApplier for MemberRemoveApplier {
    fn member_id(&self) -> &MemberId {
        &self.member_to_remove
    }

    fn init_member_state(
        &mut self,
        topology: &ClusterTopology,
    ) -> TopologyResult<MemberStateTransformer> {
        validate_can_leave(topology, &self.member_to_remove, "remove")?;
        Ok(Box::new(|member: MemberState| member.to_leaving()))
    }

    async fn apply_operation(&self) -> TopologyResult<MemberStateTransformer> {
        self.executor
            .remove_broker(&self.member_to_remove)
            .await
            .map_err(|reason| {
                TopologyError::execution_failed(
                    TopologyChangeOperation::member_remove(
                        self.coordinator.clone(),
                        self.member_to_remove.clone(),
                    ),
                    reason,
                )
            })?;
        Ok(Box::new(|member: MemberState| member.to_left()))
    }
}
