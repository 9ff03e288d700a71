//! Appliers for a member joining, leaving or re-prioritizing a partition.
//!
//! All three only change the state of the member performing them, so they
//! are [`MemberOperationApplier`]s.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{MemberOperationApplier, MemberStateTransformer};
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::{ClusterTopology, MemberState, PartitionState, PartitionStatus};
use crate::cluster::traits::PartitionChangeExecutor;
use crate::constants::MIN_REPLICAS_AFTER_LEAVE;
use crate::types::{MemberId, PartitionId, Priority};

/// Look up `member_id` and require it to be `Active`.
fn active_member<'a>(
    topology: &'a ClusterTopology,
    member_id: &MemberId,
    action: &str,
) -> TopologyResult<&'a MemberState> {
    match topology.get_member(member_id) {
        None => Err(TopologyError::invalid(format!(
            "Expected to {}, but member {} is not part of the topology",
            action, member_id
        ))),
        Some(member) if !member.is_active() => Err(TopologyError::invalid(format!(
            "Expected to {}, but member {} is in state {:?}",
            action, member_id, member.status
        ))),
        Some(member) => Ok(member),
    }
}

pub struct PartitionJoinApplier {
    member_id: MemberId,
    partition_id: PartitionId,
    priority: Priority,
    executor: Arc<dyn PartitionChangeExecutor>,
    /// Replica set the joining member bootstraps from; captured in `init`.
    members_with_priority: BTreeMap<MemberId, Priority>,
}

impl PartitionJoinApplier {
    pub fn new(
        member_id: MemberId,
        partition_id: PartitionId,
        priority: Priority,
        executor: Arc<dyn PartitionChangeExecutor>,
    ) -> Self {
        Self {
            member_id,
            partition_id,
            priority,
            executor,
            members_with_priority: BTreeMap::new(),
        }
    }
}

#[async_trait]
impl MemberOperationApplier for PartitionJoinApplier {
    fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    fn init_member_state(
        &mut self,
        topology: &ClusterTopology,
    ) -> TopologyResult<MemberStateTransformer> {
        let action = format!(
            "join partition {} on member {}",
            self.partition_id, self.member_id
        );
        let member = active_member(topology, &self.member_id, &action)?;

        if let Some(state) = member.get_partition(self.partition_id) {
            // A retried join finds the partition still joining.
            if state.status != PartitionStatus::Joining {
                return Err(TopologyError::invalid(format!(
                    "Expected to {}, but the member already replicates the partition with state {:?}",
                    action, state.status
                )));
            }
        }

        let holders = topology.members_with_partition(self.partition_id);
        if holders.iter().all(|holder| **holder == self.member_id) {
            return Err(TopologyError::invalid(format!(
                "Expected to {}, but the partition does not exist in the topology",
                action
            )));
        }

        let mut members_with_priority: BTreeMap<MemberId, Priority> = holders
            .into_iter()
            .filter_map(|holder| {
                topology
                    .get_member(holder)
                    .and_then(|m| m.get_partition(self.partition_id))
                    .map(|state| (holder.clone(), state.priority))
            })
            .collect();
        members_with_priority.insert(self.member_id.clone(), self.priority);
        self.members_with_priority = members_with_priority;

        let partition_id = self.partition_id;
        let priority = self.priority;
        Ok(Box::new(move |member: MemberState| {
            member.add_partition(partition_id, PartitionState::joining(priority))
        }))
    }

    async fn apply_operation(&self) -> TopologyResult<MemberStateTransformer> {
        self.executor
            .join(self.partition_id, self.members_with_priority.clone())
            .await
            .map_err(|reason| {
                TopologyError::execution_failed(
                    TopologyChangeOperation::partition_join(
                        self.member_id.clone(),
                        self.partition_id,
                        self.priority,
                    ),
                    reason,
                )
            })?;

        let partition_id = self.partition_id;
        Ok(Box::new(move |member: MemberState| {
            member.update_partition(partition_id, PartitionState::to_active)
        }))
    }
}

pub struct PartitionLeaveApplier {
    member_id: MemberId,
    partition_id: PartitionId,
    executor: Arc<dyn PartitionChangeExecutor>,
}

impl PartitionLeaveApplier {
    pub fn new(
        member_id: MemberId,
        partition_id: PartitionId,
        executor: Arc<dyn PartitionChangeExecutor>,
    ) -> Self {
        Self {
            member_id,
            partition_id,
            executor,
        }
    }
}

#[async_trait]
impl MemberOperationApplier for PartitionLeaveApplier {
    fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    fn init_member_state(
        &mut self,
        topology: &ClusterTopology,
    ) -> TopologyResult<MemberStateTransformer> {
        let action = format!(
            "leave partition {} on member {}",
            self.partition_id, self.member_id
        );
        let member = active_member(topology, &self.member_id, &action)?;

        match member.get_partition(self.partition_id).map(|p| p.status) {
            Some(PartitionStatus::Active) | Some(PartitionStatus::Leaving) => {}
            Some(PartitionStatus::Joining) => {
                return Err(TopologyError::invalid(format!(
                    "Expected to {}, but the partition is still joining",
                    action
                )));
            }
            None => {
                return Err(TopologyError::invalid(format!(
                    "Expected to {}, but the member does not replicate the partition",
                    action
                )));
            }
        }

        let replicas = topology.members_with_partition(self.partition_id).len();
        if replicas.saturating_sub(1) < MIN_REPLICAS_AFTER_LEAVE {
            return Err(TopologyError::invalid(format!(
                "Expected to {}, but the member is the only replica of the partition",
                action
            )));
        }

        let partition_id = self.partition_id;
        Ok(Box::new(move |member: MemberState| {
            member.update_partition(partition_id, PartitionState::to_leaving)
        }))
    }

    async fn apply_operation(&self) -> TopologyResult<MemberStateTransformer> {
        self.executor
            .leave(self.partition_id)
            .await
            .map_err(|reason| {
                TopologyError::execution_failed(
                    TopologyChangeOperation::partition_leave(
                        self.member_id.clone(),
                        self.partition_id,
                    ),
                    reason,
                )
            })?;

        let partition_id = self.partition_id;
        Ok(Box::new(move |member: MemberState| {
            member.remove_partition(partition_id)
        }))
    }
}

pub struct PartitionReconfigurePriorityApplier {
    member_id: MemberId,
    partition_id: PartitionId,
    priority: Priority,
    executor: Arc<dyn PartitionChangeExecutor>,
}

impl PartitionReconfigurePriorityApplier {
    pub fn new(
        member_id: MemberId,
        partition_id: PartitionId,
        priority: Priority,
        executor: Arc<dyn PartitionChangeExecutor>,
    ) -> Self {
        Self {
            member_id,
            partition_id,
            priority,
            executor,
        }
    }
}

#[async_trait]
impl MemberOperationApplier for PartitionReconfigurePriorityApplier {
    fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    fn init_member_state(
        &mut self,
        topology: &ClusterTopology,
    ) -> TopologyResult<MemberStateTransformer> {
        let action = format!(
            "reconfigure priority of partition {} on member {}",
            self.partition_id, self.member_id
        );
        let member = active_member(topology, &self.member_id, &action)?;

        match member.get_partition(self.partition_id) {
            Some(state) if state.status == PartitionStatus::Active => {
                Ok(Box::new(|member: MemberState| member))
            }
            Some(state) => Err(TopologyError::invalid(format!(
                "Expected to {}, but the partition is in state {:?}",
                action, state.status
            ))),
            None => Err(TopologyError::invalid(format!(
                "Expected to {}, but the member does not replicate the partition",
                action
            ))),
        }
    }

    async fn apply_operation(&self) -> TopologyResult<MemberStateTransformer> {
        self.executor
            .reconfigure_priority(self.partition_id, self.priority)
            .await
            .map_err(|reason| {
                TopologyError::execution_failed(
                    TopologyChangeOperation::partition_reconfigure_priority(
                        self.member_id.clone(),
                        self.partition_id,
                        self.priority,
                    ),
                    reason,
                )
            })?;

        let partition_id = self.partition_id;
        let priority = self.priority;
        Ok(Box::new(move |member: MemberState| {
            member.update_partition(partition_id, |state| state.with_priority(priority))
        }))
    }
}
