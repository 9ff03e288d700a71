//! Scaling the cluster to a target member set.
//!
//! ```text
//! MemberJoin      for every target member not yet in the topology
//! reassignment    of all partitions over the target members
//! MemberLeave     for every current member not in the target set
//! ```

use std::collections::BTreeSet;

use super::{AddMembersTransformer, PartitionReassignRequestTransformer, TopologyChangeRequest};
use crate::cluster::error::TopologyResult;
use crate::cluster::operations::TopologyChangeOperation;
use crate::cluster::state::ClusterTopology;
use crate::types::MemberId;

#[derive(Debug, Clone)]
pub struct ScaleRequestTransformer {
    members: BTreeSet<MemberId>,
    replication_factor: Option<i32>,
}

impl ScaleRequestTransformer {
    pub fn new(
        members: impl IntoIterator<Item = MemberId>,
        replication_factor: Option<i32>,
    ) -> Self {
        Self {
            members: members.into_iter().collect(),
            replication_factor,
        }
    }
}

impl TopologyChangeRequest for ScaleRequestTransformer {
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>> {
        let mut operations =
            AddMembersTransformer::new(self.members.iter().cloned()).operations(topology)?;

        operations.extend(
            PartitionReassignRequestTransformer::new(
                self.members.iter().cloned(),
                self.replication_factor,
            )
            .operations(topology)?,
        );

        // The reassignment empties the removed members; simulation checks
        // that they really own nothing by the time they leave.
        operations.extend(
            topology
                .members()
                .keys()
                .filter(|member_id| !self.members.contains(*member_id))
                .map(|member_id| TopologyChangeOperation::member_leave(member_id.clone())),
        );

        Ok(operations)
    }
}
