use std::collections::BTreeSet;

use super::TopologyChangeRequest;
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::ClusterTopology;
use crate::types::MemberId;

/// Adds members to the cluster. Members already in the topology are skipped.
#[derive(Debug, Clone)]
pub struct AddMembersTransformer {
    members: BTreeSet<MemberId>,
}

impl AddMembersTransformer {
    pub fn new(members: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }
}

impl TopologyChangeRequest for AddMembersTransformer {
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>> {
        Ok(self
            .members
            .iter()
            .filter(|member_id| !topology.has_member(member_id))
            .map(|member_id| TopologyChangeOperation::member_join(member_id.clone()))
            .collect())
    }
}

/// Removes members from the cluster.
///
/// The members must not replicate any partition; their partitions have to
/// be reassigned by a prior request. Members unknown to the topology are
/// skipped.
#[derive(Debug, Clone)]
pub struct RemoveMembersTransformer {
    members: BTreeSet<MemberId>,
}

impl RemoveMembersTransformer {
    pub fn new(members: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }
}

impl TopologyChangeRequest for RemoveMembersTransformer {
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>> {
        let mut operations = Vec::new();
        for member_id in &self.members {
            let Some(member) = topology.get_member(member_id) else {
                continue;
            };
            if !member.partitions.is_empty() {
                let partitions: Vec<String> =
                    member.partitions.keys().map(|p| p.to_string()).collect();
                return Err(TopologyError::invalid(format!(
                    "Expected to remove member {}, but the member still replicates partitions [{}]. Reassign its partitions before removing it",
                    member_id,
                    partitions.join(", ")
                )));
            }
            operations.push(TopologyChangeOperation::member_leave(member_id.clone()));
        }
        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::mock_executor::TopologyBuilder;

    fn ids(ids: &[u32]) -> Vec<MemberId> {
        ids.iter().map(|id| MemberId::from(*id)).collect()
    }

    #[test]
    fn test_add_members_skips_existing() {
        let topology = TopologyBuilder::new().member(1, &[1]).build();
        let operations = AddMembersTransformer::new(ids(&[3, 1, 2]))
            .operations(&topology)
            .unwrap();
        assert_eq!(
            operations,
            vec![
                TopologyChangeOperation::member_join(2),
                TopologyChangeOperation::member_join(3),
            ]
        );
    }

    #[test]
    fn test_remove_members_requires_no_partitions() {
        let topology = TopologyBuilder::new().member(1, &[1]).member(2, &[1]).build();
        let err = RemoveMembersTransformer::new(ids(&[2]))
            .operations(&topology)
            .err()
            .unwrap();
        assert!(matches!(err, TopologyError::InvalidRequest(_)));
        assert!(err.to_string().contains("still replicates partitions [1]"));
    }

    #[test]
    fn test_remove_members_emits_leaves() {
        let topology = TopologyBuilder::new()
            .member(1, &[1])
            .member(2, &[])
            .member(3, &[])
            .build();
        let operations = RemoveMembersTransformer::new(ids(&[3, 2, 9]))
            .operations(&topology)
            .unwrap();
        assert_eq!(
            operations,
            vec![
                TopologyChangeOperation::member_leave(2),
                TopologyChangeOperation::member_leave(3),
            ]
        );
    }
}
