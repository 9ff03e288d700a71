//! Partition distribution over a set of members.
//!
//! The distributor is a pure function of (sorted partition ids, member set,
//! replication factor). Simulation and the real execution both derive target
//! assignments from it, so it must never depend on iteration order of hash
//! maps, clocks or randomness.
//!
//! # Round Robin
//!
//! Members are sorted. The partition at index `i` of the sorted partition list
//! is placed on the `replication_factor` members starting at `i` (wrapping).
//! The first of them is the primary and gets the highest priority:
//!
//! ```text
//! members [A, B, C], replication factor 2
//!
//! partition 1 -> A (prio 2), B (prio 1)
//! partition 2 -> B (prio 2), C (prio 1)
//! partition 3 -> C (prio 2), A (prio 1)
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{MemberId, PartitionId, Priority};

/// Target placement of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub partition_id: PartitionId,
    /// Replica priorities, keyed by member.
    pub priorities: BTreeMap<MemberId, Priority>,
}

impl PartitionMetadata {
    pub fn priority_of(&self, member_id: &MemberId) -> Option<Priority> {
        self.priorities.get(member_id).copied()
    }
}

/// Computes where each partition's replicas should live.
pub trait PartitionDistributor: Send + Sync {
    /// Distribute `partition_ids` over `members`.
    ///
    /// Callers guarantee `0 < replication_factor <= members.len()`.
    fn distribute_partitions(
        &self,
        members: &BTreeSet<MemberId>,
        partition_ids: &[PartitionId],
        replication_factor: usize,
    ) -> Vec<PartitionMetadata>;
}

/// Round-robin distribution with descending priorities.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinPartitionDistributor;

impl PartitionDistributor for RoundRobinPartitionDistributor {
    fn distribute_partitions(
        &self,
        members: &BTreeSet<MemberId>,
        partition_ids: &[PartitionId],
        replication_factor: usize,
    ) -> Vec<PartitionMetadata> {
        let sorted_members: Vec<&MemberId> = members.iter().collect();
        if sorted_members.is_empty() || replication_factor == 0 {
            return Vec::new();
        }

        let mut sorted_partitions = partition_ids.to_vec();
        sorted_partitions.sort();
        sorted_partitions.dedup();

        let replicas = replication_factor.min(sorted_members.len());
        let target_priority = replicas as Priority;

        sorted_partitions
            .into_iter()
            .enumerate()
            .map(|(index, partition_id)| {
                let priorities: BTreeMap<MemberId, Priority> = (0..replicas)
                    .map(|offset| {
                        let member = sorted_members[(index + offset) % sorted_members.len()];
                        (member.clone(), target_priority - offset as Priority)
                    })
                    .collect();

                PartitionMetadata {
                    partition_id,
                    priorities,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(ids: &[u32]) -> BTreeSet<MemberId> {
        ids.iter().map(|id| MemberId::from(*id)).collect()
    }

    fn partitions(ids: &[u32]) -> Vec<PartitionId> {
        ids.iter().map(|id| PartitionId::new(*id)).collect()
    }

    #[test]
    fn test_round_robin_placement() {
        let distribution =
            RoundRobinPartitionDistributor.distribute_partitions(&members(&[1, 2, 3]), &partitions(&[1, 2, 3]), 2);

        assert_eq!(distribution.len(), 3);
        assert_eq!(
            distribution[0].priorities,
            BTreeMap::from([(MemberId::from(1), 2), (MemberId::from(2), 1)])
        );
        assert_eq!(
            distribution[1].priorities,
            BTreeMap::from([(MemberId::from(2), 2), (MemberId::from(3), 1)])
        );
        assert_eq!(
            distribution[2].priorities,
            BTreeMap::from([(MemberId::from(3), 2), (MemberId::from(1), 1)])
        );
        assert_eq!(distribution[2].priority_of(&MemberId::from(3)), Some(2));
        assert_eq!(distribution[2].priority_of(&MemberId::from(2)), None);
    }

    #[test]
    fn test_deterministic_regardless_of_input_order() {
        let a = RoundRobinPartitionDistributor.distribute_partitions(
            &members(&[3, 1, 2]),
            &partitions(&[2, 1]),
            3,
        );
        let b = RoundRobinPartitionDistributor.distribute_partitions(
            &members(&[1, 2, 3]),
            &partitions(&[1, 2]),
            3,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_numeric_member_order() {
        // "10" sorts after "9" numerically
        let distribution =
            RoundRobinPartitionDistributor.distribute_partitions(&members(&[9, 10]), &partitions(&[1]), 1);
        assert_eq!(
            distribution[0].priorities,
            BTreeMap::from([(MemberId::from(9), 1)])
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert!(
            RoundRobinPartitionDistributor
                .distribute_partitions(&BTreeSet::new(), &partitions(&[1]), 1)
                .is_empty()
        );
        assert!(
            RoundRobinPartitionDistributor
                .distribute_partitions(&members(&[1]), &partitions(&[1]), 0)
                .is_empty()
        );
    }
}
