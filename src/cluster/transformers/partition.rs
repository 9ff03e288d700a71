use super::TopologyChangeRequest;
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::ClusterTopology;
use crate::types::{MemberId, PartitionId, Priority};

fn require_member(topology: &ClusterTopology, member_id: &MemberId, action: &str) -> TopologyResult<()> {
    if topology.has_member(member_id) {
        Ok(())
    } else {
        Err(TopologyError::invalid(format!(
            "Expected to {}, but member {} is not part of the topology",
            action, member_id
        )))
    }
}

/// A single member joins a single partition.
#[derive(Debug, Clone)]
pub struct JoinPartitionTransformer {
    member_id: MemberId,
    partition_id: PartitionId,
    priority: Priority,
}

impl JoinPartitionTransformer {
    pub fn new(member_id: MemberId, partition_id: PartitionId, priority: Priority) -> Self {
        Self {
            member_id,
            partition_id,
            priority,
        }
    }
}

impl TopologyChangeRequest for JoinPartitionTransformer {
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>> {
        let action = format!("join partition {}", self.partition_id);
        require_member(topology, &self.member_id, &action)?;

        let already_joined = topology
            .get_member(&self.member_id)
            .is_some_and(|member| member.has_partition(self.partition_id));
        if already_joined {
            return Ok(Vec::new());
        }

        Ok(vec![TopologyChangeOperation::partition_join(
            self.member_id.clone(),
            self.partition_id,
            self.priority,
        )])
    }
}

/// A single member leaves a single partition.
#[derive(Debug, Clone)]
pub struct LeavePartitionTransformer {
    member_id: MemberId,
    partition_id: PartitionId,
}

impl LeavePartitionTransformer {
    pub fn new(member_id: MemberId, partition_id: PartitionId) -> Self {
        Self {
            member_id,
            partition_id,
        }
    }
}

impl TopologyChangeRequest for LeavePartitionTransformer {
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>> {
        let action = format!("leave partition {}", self.partition_id);
        require_member(topology, &self.member_id, &action)?;

        let holds_partition = topology
            .get_member(&self.member_id)
            .is_some_and(|member| member.has_partition(self.partition_id));
        if !holds_partition {
            return Ok(Vec::new());
        }

        Ok(vec![TopologyChangeOperation::partition_leave(
            self.member_id.clone(),
            self.partition_id,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::mock_executor::TopologyBuilder;

    #[test]
    fn test_join_is_noop_when_already_joined() {
        let topology = TopologyBuilder::new().member(1, &[1]).build();
        let operations = JoinPartitionTransformer::new(MemberId::from(1), PartitionId::new(1), 1)
            .operations(&topology)
            .unwrap();
        assert!(operations.is_empty());
    }

    #[test]
    fn test_join_emits_operation() {
        let topology = TopologyBuilder::new().member(1, &[1]).member(2, &[]).build();
        let operations = JoinPartitionTransformer::new(MemberId::from(2), PartitionId::new(1), 3)
            .operations(&topology)
            .unwrap();
        assert_eq!(
            operations,
            vec![TopologyChangeOperation::partition_join(2, PartitionId::new(1), 3)]
        );
    }

    #[test]
    fn test_leave_unknown_member_fails() {
        let topology = TopologyBuilder::new().member(1, &[1]).build();
        let result = LeavePartitionTransformer::new(MemberId::from(5), PartitionId::new(1))
            .operations(&topology);
        assert!(matches!(result, Err(TopologyError::InvalidRequest(_))));
    }

    #[test]
    fn test_leave_is_noop_when_not_held() {
        let topology = TopologyBuilder::new().member(1, &[1]).member(2, &[2]).build();
        let operations = LeavePartitionTransformer::new(MemberId::from(2), PartitionId::new(1))
            .operations(&topology)
            .unwrap();
        assert!(operations.is_empty());
    }
}
