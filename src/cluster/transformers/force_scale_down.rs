//! Forced scale down after permanent member loss.
//!
//! Every partition is shrunk to the retained members that already replicate
//! it, then every member that is not retained is removed:
//!
//! ```text
//! retain {1}, p1 on {1, 2, 3}, p2 on {1, 3}
//!
//!   PartitionForceReconfigure(1, p1, [1])
//!   PartitionForceReconfigure(1, p2, [1])
//!   MemberRemove(1 removes 2)
//!   MemberRemove(1 removes 3)
//! ```
//!
//! A partition no retained member replicates would lose all its data, so
//! the whole request is rejected instead.

use std::collections::BTreeSet;

use super::TopologyChangeRequest;
use crate::cluster::coordinator::coordinator_of_set;
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::ClusterTopology;
use crate::types::MemberId;

#[derive(Debug, Clone)]
pub struct ForceScaleDownRequestTransformer {
    members_to_retain: BTreeSet<MemberId>,
}

impl ForceScaleDownRequestTransformer {
    pub fn new(members_to_retain: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            members_to_retain: members_to_retain.into_iter().collect(),
        }
    }
}

impl TopologyChangeRequest for ForceScaleDownRequestTransformer {
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>> {
        let Some(coordinator) = coordinator_of_set(&self.members_to_retain) else {
            return Err(TopologyError::invalid(
                "Expected to force scale down to a non-empty set of members, but the set is empty",
            ));
        };

        let unknown: Vec<&str> = self
            .members_to_retain
            .iter()
            .filter(|member_id| !topology.has_member(member_id))
            .map(|member_id| member_id.as_str())
            .collect();
        if !unknown.is_empty() {
            return Err(TopologyError::invalid(format!(
                "Expected to retain members that are part of the topology, but members [{}] are unknown",
                unknown.join(", ")
            )));
        }

        let mut operations = Vec::new();
        for partition_id in topology.partition_ids() {
            let retained: Vec<MemberId> = topology
                .members_with_partition(partition_id)
                .into_iter()
                .filter(|holder| self.members_to_retain.contains(*holder))
                .cloned()
                .collect();

            let Some(owner) = retained.first().cloned() else {
                return Err(TopologyError::invalid(format!(
                    "Expected to retain at least one replica of partition {}, but none of the retained members replicates it",
                    partition_id
                )));
            };
            operations.push(TopologyChangeOperation::partition_force_reconfigure(
                owner,
                partition_id,
                retained,
            ));
        }

        operations.extend(
            topology
                .members()
                .keys()
                .filter(|member_id| !self.members_to_retain.contains(*member_id))
                .map(|member_id| {
                    TopologyChangeOperation::member_remove(coordinator.clone(), member_id.clone())
                }),
        );

        Ok(operations)
    }

    fn is_forced(&self) -> bool {
        true
    }
}
