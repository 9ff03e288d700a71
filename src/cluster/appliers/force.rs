//! Forced reconfiguration of a partition's replica set.
//!
//! Used when replicas are permanently lost and the remaining ones cannot
//! reach quorum to remove them the regular way. The removed replicas never
//! acknowledge anything, so the applier rewrites the partition state of
//! several members at once and works on the whole topology.

use async_trait::async_trait;
use std::sync::Arc;

use super::{OperationApplier, TopologyTransformer};
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::ClusterTopology;
use crate::cluster::traits::PartitionChangeExecutor;
use crate::types::{MemberId, PartitionId};

pub struct PartitionForceReconfigureApplier {
    member_id: MemberId,
    partition_id: PartitionId,
    members: Vec<MemberId>,
    executor: Arc<dyn PartitionChangeExecutor>,
}

impl PartitionForceReconfigureApplier {
    pub fn new(
        member_id: MemberId,
        partition_id: PartitionId,
        members: Vec<MemberId>,
        executor: Arc<dyn PartitionChangeExecutor>,
    ) -> Self {
        Self {
            member_id,
            partition_id,
            members,
            executor,
        }
    }

    fn operation(&self) -> TopologyChangeOperation {
        TopologyChangeOperation::partition_force_reconfigure(
            self.member_id.clone(),
            self.partition_id,
            self.members.clone(),
        )
    }
}

#[async_trait]
impl OperationApplier for PartitionForceReconfigureApplier {
    fn init(&mut self, topology: &ClusterTopology) -> TopologyResult<TopologyTransformer> {
        let action = format!(
            "force reconfigure partition {} to members {:?}",
            self.partition_id,
            self.members.iter().map(|m| m.as_str()).collect::<Vec<_>>()
        );

        if self.members.is_empty() {
            return Err(TopologyError::invalid(format!(
                "Expected to {}, but the new replica set is empty",
                action
            )));
        }
        if !self.members.contains(&self.member_id) {
            return Err(TopologyError::invalid(format!(
                "Expected to {}, but the initiating member {} is not part of the new replica set",
                action, self.member_id
            )));
        }

        for member_id in &self.members {
            match topology.get_member(member_id) {
                None => {
                    return Err(TopologyError::invalid(format!(
                        "Expected to {}, but member {} is not part of the topology",
                        action, member_id
                    )));
                }
                Some(member) if !member.is_active() => {
                    return Err(TopologyError::invalid(format!(
                        "Expected to {}, but member {} is in state {:?}",
                        action, member_id, member.status
                    )));
                }
                Some(member) if !member.has_partition(self.partition_id) => {
                    return Err(TopologyError::invalid(format!(
                        "Expected to {}, but member {} does not replicate the partition",
                        action, member_id
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Box::new(|topology: ClusterTopology| topology))
    }

    async fn apply(&self) -> TopologyResult<TopologyTransformer> {
        self.executor
            .force_reconfigure(self.partition_id, self.members.clone())
            .await
            .map_err(|reason| TopologyError::execution_failed(self.operation(), reason))?;

        let partition_id = self.partition_id;
        let retained = self.members.clone();
        Ok(Box::new(move |topology: ClusterTopology| {
            let removed: Vec<MemberId> = topology
                .members_with_partition(partition_id)
                .into_iter()
                .filter(|holder| !retained.contains(holder))
                .cloned()
                .collect();
            removed.iter().fold(topology, |topology, member_id| {
                topology.update_member(member_id, |member| member.remove_partition(partition_id))
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::mock_executor::{RecordingPartitionExecutor, TopologyBuilder};

    fn m(id: u32) -> MemberId {
        MemberId::from(id)
    }

    fn topology() -> ClusterTopology {
        TopologyBuilder::new()
            .member(1, &[1, 2])
            .member(2, &[1, 2])
            .member(3, &[1, 2])
            .build()
    }

    fn applier(initiator: u32, members: &[u32]) -> PartitionForceReconfigureApplier {
        PartitionForceReconfigureApplier::new(
            m(initiator),
            PartitionId::new(1),
            members.iter().map(|id| m(*id)).collect(),
            Arc::new(RecordingPartitionExecutor::default()),
        )
    }

    #[tokio::test]
    async fn test_strips_partition_from_removed_members() {
        let topology = topology();
        let mut applier = applier(1, &[1, 2]);

        let topology = (applier.init(&topology).unwrap())(topology);
        let topology = (applier.apply().await.unwrap())(topology);

        assert_eq!(
            topology.members_with_partition(PartitionId::new(1)),
            vec![&m(1), &m(2)]
        );
        // Other partitions of the removed member are untouched.
        assert!(topology.get_member(&m(3)).unwrap().has_partition(PartitionId::new(2)));
    }

    #[test]
    fn test_rejects_empty_set() {
        assert!(applier(1, &[]).init(&topology()).is_err());
    }

    #[test]
    fn test_rejects_initiator_outside_set() {
        let err = applier(3, &[1, 2]).init(&topology()).err().unwrap();
        assert!(err.to_string().contains("initiating member 3"));
    }

    #[test]
    fn test_rejects_member_without_partition() {
        let topology = TopologyBuilder::new().member(1, &[1]).member(2, &[2]).build();
        assert!(applier(1, &[1, 2]).init(&topology).is_err());
    }

    #[test]
    fn test_rejects_unknown_member() {
        assert!(applier(1, &[1, 9]).init(&topology()).is_err());
    }
}
