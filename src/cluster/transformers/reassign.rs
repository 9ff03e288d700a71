//! Reassignment of every partition over a target member set.
//!
//! ```text
//! current:  p1 -> {1, 2, 3}          target members {2, 3, 4}, rf 2
//! target:   p1 -> {2: prio 2, 3: prio 1}
//!
//! operations for p1:
//!   joins              (none, 2 and 3 already replicate p1)
//!   priority changes   PartitionReconfigurePriority(2, p1, 2)   if 2 had another priority
//!   leaves             PartitionLeave(1, p1)
//! ```
//!
//! Joins come before leaves within a partition so the replica count never
//! drops below the smaller of the old and the new replication factor.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::TopologyChangeRequest;
use crate::cluster::distributor::{
    PartitionDistributor, PartitionMetadata, RoundRobinPartitionDistributor,
};
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::ClusterTopology;
use crate::types::{MemberId, PartitionId};

pub struct PartitionReassignRequestTransformer {
    members: BTreeSet<MemberId>,
    replication_factor: Option<i32>,
    distributor: Arc<dyn PartitionDistributor>,
}

impl PartitionReassignRequestTransformer {
    /// Reassign over `members`. Without a replication factor the topology's
    /// current minimum replication factor is kept.
    pub fn new(
        members: impl IntoIterator<Item = MemberId>,
        replication_factor: Option<i32>,
    ) -> Self {
        Self {
            members: members.into_iter().collect(),
            replication_factor,
            distributor: Arc::new(RoundRobinPartitionDistributor),
        }
    }

    pub fn with_distributor(mut self, distributor: Arc<dyn PartitionDistributor>) -> Self {
        self.distributor = distributor;
        self
    }

    fn resolve_replication_factor(&self, topology: &ClusterTopology) -> TopologyResult<usize> {
        let replication_factor = self
            .replication_factor
            .unwrap_or(topology.min_replication_factor() as i32);

        if replication_factor <= 0 {
            return Err(TopologyError::invalid(format!(
                "Expected replication factor to be greater than 0, but was {}",
                replication_factor
            )));
        }
        if self.members.len() < replication_factor as usize {
            return Err(TopologyError::invalid(format!(
                "Expected to reassign partitions to at least {} members to satisfy replication factor {}, but got {} members",
                replication_factor,
                replication_factor,
                self.members.len()
            )));
        }
        Ok(replication_factor as usize)
    }

    /// Operations moving `topology` to the distribution of `target`.
    fn operations_for_partition(
        topology: &ClusterTopology,
        target: &PartitionMetadata,
    ) -> Vec<TopologyChangeOperation> {
        let partition_id = target.partition_id;
        let current: Vec<&MemberId> = topology.members_with_partition(partition_id);
        let current_priority = |member_id: &MemberId| {
            topology
                .get_member(member_id)
                .and_then(|member| member.get_partition(partition_id))
                .map(|state| state.priority)
        };

        let mut operations = Vec::new();

        for (member_id, priority) in &target.priorities {
            if !current.contains(&member_id) {
                operations.push(TopologyChangeOperation::partition_join(
                    member_id.clone(),
                    partition_id,
                    *priority,
                ));
            }
        }

        for (member_id, priority) in &target.priorities {
            match current_priority(member_id) {
                Some(current) if current != *priority => {
                    operations.push(TopologyChangeOperation::partition_reconfigure_priority(
                        member_id.clone(),
                        partition_id,
                        *priority,
                    ));
                }
                _ => {}
            }
        }

        for member_id in current {
            if !target.priorities.contains_key(member_id) {
                operations.push(TopologyChangeOperation::partition_leave(
                    member_id.clone(),
                    partition_id,
                ));
            }
        }

        operations
    }
}

impl TopologyChangeRequest for PartitionReassignRequestTransformer {
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>> {
        if self.members.is_empty() {
            return Err(TopologyError::invalid(
                "Expected to reassign partitions to a non-empty set of members, but the set is empty",
            ));
        }

        let partition_ids: Vec<PartitionId> = topology.partition_ids().into_iter().collect();
        if partition_ids.is_empty() {
            return Err(TopologyError::invalid(
                "Expected to reassign partitions, but the topology has no partitions",
            ));
        }

        let replication_factor = self.resolve_replication_factor(topology)?;
        let distribution =
            self.distributor
                .distribute_partitions(&self.members, &partition_ids, replication_factor);

        Ok(distribution
            .iter()
            .flat_map(|target| Self::operations_for_partition(topology, target))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::mock_executor::TopologyBuilder;

    fn ids(ids: &[u32]) -> Vec<MemberId> {
        ids.iter().map(|id| MemberId::from(*id)).collect()
    }

    fn p(id: u32) -> PartitionId {
        PartitionId::new(id)
    }

    fn three_member_topology() -> ClusterTopology {
        TopologyBuilder::new()
            .member_with_priorities(1, &[(1, 3), (2, 1)])
            .member_with_priorities(2, &[(1, 2), (2, 3)])
            .member_with_priorities(3, &[(1, 1), (2, 2)])
            .build()
    }

    #[test]
    fn test_reassign_to_new_member_set() {
        let operations = PartitionReassignRequestTransformer::new(ids(&[2, 3, 4]), Some(2))
            .operations(&three_member_topology())
            .unwrap();

        // p1 -> {2: 2, 3: 1}, p2 -> {3: 2, 4: 1}
        assert_eq!(
            operations,
            vec![
                TopologyChangeOperation::partition_leave(1, p(1)),
                TopologyChangeOperation::partition_join(4, p(2), 1),
                TopologyChangeOperation::partition_leave(1, p(2)),
                TopologyChangeOperation::partition_leave(2, p(2)),
            ]
        );
    }

    #[test]
    fn test_balanced_topology_needs_no_operations() {
        let operations = PartitionReassignRequestTransformer::new(ids(&[1, 2, 3]), Some(3))
            .operations(&three_member_topology())
            .unwrap();
        assert!(operations.is_empty());
    }

    #[test]
    fn test_reassign_is_deterministic() {
        let topology = three_member_topology();
        let first = PartitionReassignRequestTransformer::new(ids(&[4, 2, 3]), Some(2))
            .operations(&topology)
            .unwrap();
        let second = PartitionReassignRequestTransformer::new(ids(&[2, 3, 4]), Some(2))
            .operations(&topology)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_replication_factor_defaults_to_current() {
        let topology = TopologyBuilder::new().member(1, &[1]).member(2, &[1]).build();
        let operations = PartitionReassignRequestTransformer::new(ids(&[1, 2]), None)
            .operations(&topology)
            .unwrap();
        // rf stays 2, only the primary priority changes
        assert_eq!(
            operations,
            vec![TopologyChangeOperation::partition_reconfigure_priority(1, p(1), 2)]
        );
    }

    #[test]
    fn test_rejects_non_positive_replication_factor() {
        let result = PartitionReassignRequestTransformer::new(ids(&[1, 2]), Some(0))
            .operations(&three_member_topology());
        assert!(matches!(result, Err(TopologyError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_too_few_members() {
        let err = PartitionReassignRequestTransformer::new(ids(&[1, 2]), Some(3))
            .operations(&three_member_topology())
            .err()
            .unwrap();
        assert!(err.to_string().contains("at least 3 members"));
    }

    #[test]
    fn test_rejects_empty_member_set() {
        let result = PartitionReassignRequestTransformer::new(Vec::new(), Some(1))
            .operations(&three_member_topology());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_topology_without_partitions() {
        let topology = TopologyBuilder::new().member(1, &[]).build();
        let result = PartitionReassignRequestTransformer::new(ids(&[1]), Some(1)).operations(&topology);
        assert!(result.is_err());
    }
}
