//! The cluster topology: the single root value every node gossips.
//!
//! `ClusterTopology` is copy-on-write. Every transition consumes a value and
//! returns a new one, so a simulation can mutate a clone while readers keep
//! using the live value.
//!
//! # Versioning
//!
//! ```text
//! version -1  uninitialized (no member has bootstrapped the topology yet)
//! version  0  initialized
//! version +1  on every structural change: start, complete or cancel a plan
//! ```
//!
//! Member updates bump the member's own version instead; [`ClusterTopology::merge`]
//! uses both to decide which copy of a gossiped value is newer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::member::{MemberState, MemberStatus};
use super::plan::{ChangeStatus, ClusterChangePlan, CompletedChange};
use crate::cluster::error::{TopologyError, TopologyResult};
use crate::cluster::operations::TopologyChangeOperation;
use crate::constants::{INITIAL_VERSION, NO_CHANGE_ID, UNINITIALIZED_VERSION};
use crate::types::{ChangeId, MemberId, PartitionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterTopology {
    version: i64,
    members: BTreeMap<MemberId, MemberState>,
    last_change: Option<CompletedChange>,
    pending_changes: Option<ClusterChangePlan>,
}

impl Default for ClusterTopology {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl ClusterTopology {
    /// The topology before the cluster has bootstrapped.
    pub fn uninitialized() -> Self {
        Self {
            version: UNINITIALIZED_VERSION,
            members: BTreeMap::new(),
            last_change: None,
            pending_changes: None,
        }
    }

    /// An initialized, empty topology.
    pub fn init() -> Self {
        Self {
            version: INITIAL_VERSION,
            ..Self::uninitialized()
        }
    }

    pub fn is_uninitialized(&self) -> bool {
        self.version == UNINITIALIZED_VERSION
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn members(&self) -> &BTreeMap<MemberId, MemberState> {
        &self.members
    }

    pub fn get_member(&self, member_id: &MemberId) -> Option<&MemberState> {
        self.members.get(member_id)
    }

    pub fn has_member(&self, member_id: &MemberId) -> bool {
        self.members.contains_key(member_id)
    }

    pub fn last_change(&self) -> Option<&CompletedChange> {
        self.last_change.as_ref()
    }

    pub fn pending_changes(&self) -> Option<&ClusterChangePlan> {
        self.pending_changes.as_ref()
    }

    /// Add or replace a member. Used when bootstrapping a topology.
    pub fn add_member(mut self, member_id: MemberId, state: MemberState) -> Self {
        self.members.insert(member_id, state);
        self
    }

    /// Apply `f` to a member's state.
    ///
    /// A member the topology does not know yet starts from
    /// [`MemberState::uninitialized`]. A member whose new state is `Left` is
    /// removed from the topology.
    pub fn update_member(
        mut self,
        member_id: &MemberId,
        f: impl FnOnce(MemberState) -> MemberState,
    ) -> Self {
        let current = self
            .members
            .remove(member_id)
            .unwrap_or_else(MemberState::uninitialized);
        let updated = f(current);
        if updated.status != MemberStatus::Left {
            self.members.insert(member_id.clone(), updated);
        }
        self
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending_changes
            .as_ref()
            .is_some_and(|plan| plan.has_pending_operations())
    }

    pub fn next_pending_operation(&self) -> Option<&TopologyChangeOperation> {
        self.pending_changes
            .as_ref()
            .and_then(|plan| plan.next_pending_operation())
    }

    /// Id of the most recently finished change, or 0.
    pub fn last_change_id(&self) -> ChangeId {
        self.last_change
            .as_ref()
            .map(|change| change.id)
            .unwrap_or(NO_CHANGE_ID)
    }

    /// Start a new change plan.
    ///
    /// The plan id is the new topology version, so ids are monotonic across
    /// the cluster. An empty operation list leaves the topology unchanged.
    pub fn start_topology_change(
        self,
        operations: Vec<TopologyChangeOperation>,
    ) -> TopologyResult<Self> {
        if self.has_pending_changes() {
            let pending_id = self.pending_changes.as_ref().map(|p| p.id).unwrap_or_default();
            return Err(TopologyError::ConcurrentModification(format!(
                "Expected to start a new topology change, but change {} is still in progress",
                pending_id
            )));
        }
        if operations.is_empty() {
            return Ok(self);
        }

        let version = self.version + 1;
        Ok(Self {
            version,
            pending_changes: Some(ClusterChangePlan::init(version as ChangeId, operations)),
            ..self
        })
    }

    /// Apply the result of the head operation and advance the plan.
    ///
    /// When the last operation completes the plan becomes `last_change`.
    pub fn advance_topology_change(
        self,
        transformer: impl FnOnce(ClusterTopology) -> ClusterTopology,
    ) -> TopologyResult<Self> {
        if !self.has_pending_changes() {
            return Err(TopologyError::OperationNotAllowed(
                "Expected to advance the topology change, but no change is in progress".into(),
            ));
        }

        let mut updated = transformer(self);
        let plan = match updated.pending_changes.take() {
            Some(plan) => plan.advance(),
            None => {
                return Err(TopologyError::Internal(
                    "Topology transformer discarded the pending change plan".into(),
                ));
            }
        };

        if plan.has_pending_operations() {
            updated.pending_changes = Some(plan);
        } else {
            updated.last_change = Some(plan.finish(ChangeStatus::Completed));
            updated.version += 1;
        }
        Ok(updated)
    }

    /// Drop every operation that has not been applied yet.
    ///
    /// Already applied operations are not undone; they are kept in the
    /// resulting `last_change` record.
    pub fn cancel_pending_changes(mut self) -> Self {
        match self.pending_changes.take() {
            Some(plan) => Self {
                version: self.version + 1,
                last_change: Some(plan.finish(ChangeStatus::Cancelled)),
                ..self
            },
            None => self,
        }
    }

    /// Sorted ids of every partition replicated by some member.
    pub fn partition_ids(&self) -> BTreeSet<PartitionId> {
        self.members
            .values()
            .flat_map(|member| member.partitions.keys().copied())
            .collect()
    }

    pub fn partition_count(&self) -> usize {
        self.partition_ids().len()
    }

    /// Members replicating `partition_id`, in member order.
    pub fn members_with_partition(&self, partition_id: PartitionId) -> Vec<&MemberId> {
        self.members
            .iter()
            .filter(|(_, member)| member.has_partition(partition_id))
            .map(|(id, _)| id)
            .collect()
    }

    /// Smallest replica count over all partitions; 0 without partitions.
    pub fn min_replication_factor(&self) -> usize {
        self.partition_ids()
            .into_iter()
            .map(|partition_id| self.members_with_partition(partition_id).len())
            .min()
            .unwrap_or(0)
    }

    /// Number of plan steps this copy has seen: the pending plan's version,
    /// or 0 without a pending plan.
    fn plan_progress(&self) -> i64 {
        self.pending_changes
            .as_ref()
            .map(|plan| plan.version)
            .unwrap_or_default()
    }

    /// Combine a gossiped copy with this one.
    ///
    /// The higher topology version wins, then the copy further along in the
    /// pending plan. Advancing a plan can remove a member, so members are
    /// only merged one by one, keeping the higher member version, when both
    /// copies are at the same plan step.
    pub fn merge(self, other: ClusterTopology) -> ClusterTopology {
        if other.version > self.version {
            return other;
        }
        if other.version < self.version {
            return self;
        }
        match other.plan_progress().cmp(&self.plan_progress()) {
            std::cmp::Ordering::Greater => return other,
            std::cmp::Ordering::Less => return self,
            std::cmp::Ordering::Equal => {}
        }

        let mut members = self.members;
        for (id, theirs) in other.members {
            match members.get(&id) {
                Some(ours) if ours.version >= theirs.version => {}
                _ => {
                    members.insert(id, theirs);
                }
            }
        }

        let pending_changes = match (self.pending_changes, other.pending_changes) {
            (Some(ours), Some(theirs)) => {
                if theirs.version > ours.version {
                    Some(theirs)
                } else {
                    Some(ours)
                }
            }
            (ours, theirs) => ours.or(theirs),
        };

        ClusterTopology {
            version: self.version,
            members,
            last_change: self.last_change.or(other.last_change),
            pending_changes,
        }
    }

    /// Encode for gossip or persistence.
    pub fn encode(&self) -> TopologyResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> TopologyResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::state::PartitionState;

    fn member(partitions: &[u32]) -> MemberState {
        MemberState::active(
            partitions
                .iter()
                .map(|p| (PartitionId::new(*p), PartitionState::active(1)))
                .collect(),
        )
    }

    fn topology() -> ClusterTopology {
        ClusterTopology::init()
            .add_member(MemberId::from(1), member(&[1, 2]))
            .add_member(MemberId::from(2), member(&[1]))
            .add_member(MemberId::from(3), member(&[2]))
    }

    #[test]
    fn test_uninitialized() {
        assert!(ClusterTopology::uninitialized().is_uninitialized());
        assert!(!ClusterTopology::init().is_uninitialized());
    }

    #[test]
    fn test_update_member_inserts_unknown_member() {
        let topology = ClusterTopology::init().update_member(&MemberId::from(4), |m| m.to_joining());
        assert_eq!(
            topology.get_member(&MemberId::from(4)).map(|m| m.status),
            Some(MemberStatus::Joining)
        );
    }

    #[test]
    fn test_update_member_to_left_removes_member() {
        let topology = ClusterTopology::init()
            .add_member(MemberId::from(4), member(&[]))
            .update_member(&MemberId::from(4), |m| m.to_leaving().to_left());
        assert!(!topology.has_member(&MemberId::from(4)));
    }

    #[test]
    fn test_start_change_uses_new_version_as_id() {
        let topology = topology()
            .start_topology_change(vec![TopologyChangeOperation::member_join(4)])
            .unwrap();
        assert!(topology.has_pending_changes());
        assert_eq!(topology.version(), 1);
        assert_eq!(topology.pending_changes().map(|p| p.id), Some(1));
    }

    #[test]
    fn test_start_change_rejects_second_change() {
        let topology = topology()
            .start_topology_change(vec![TopologyChangeOperation::member_join(4)])
            .unwrap();
        let result = topology.start_topology_change(vec![TopologyChangeOperation::member_join(5)]);
        assert!(matches!(
            result,
            Err(TopologyError::ConcurrentModification(_))
        ));
    }

    #[test]
    fn test_start_change_without_operations_is_noop() {
        let before = topology();
        let after = before.clone().start_topology_change(vec![]).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_advance_completes_plan() {
        let topology = topology()
            .start_topology_change(vec![TopologyChangeOperation::member_join(4)])
            .unwrap()
            .advance_topology_change(|t| t.update_member(&MemberId::from(4), |m| m.to_active()))
            .unwrap();

        assert!(!topology.has_pending_changes());
        assert!(topology.pending_changes().is_none());
        assert_eq!(topology.version(), 2);
        let last = topology.last_change().unwrap();
        assert_eq!(last.id, 1);
        assert_eq!(last.status, ChangeStatus::Completed);
        assert_eq!(last.operations.len(), 1);
        assert!(topology.get_member(&MemberId::from(4)).unwrap().is_active());
    }

    #[test]
    fn test_advance_without_plan_fails() {
        let result = topology().advance_topology_change(|t| t);
        assert!(matches!(result, Err(TopologyError::OperationNotAllowed(_))));
    }

    #[test]
    fn test_cancel_keeps_completed_prefix() {
        let topology = topology()
            .start_topology_change(vec![
                TopologyChangeOperation::member_join(4),
                TopologyChangeOperation::member_join(5),
            ])
            .unwrap()
            .advance_topology_change(|t| t)
            .unwrap()
            .cancel_pending_changes();

        assert!(!topology.has_pending_changes());
        let last = topology.last_change().unwrap();
        assert_eq!(last.status, ChangeStatus::Cancelled);
        assert_eq!(
            last.operations
                .iter()
                .map(|op| op.operation.clone())
                .collect::<Vec<_>>(),
            vec![TopologyChangeOperation::member_join(4)]
        );
    }

    #[test]
    fn test_partition_queries() {
        let topology = topology();
        assert_eq!(
            topology.partition_ids().into_iter().collect::<Vec<_>>(),
            vec![PartitionId::new(1), PartitionId::new(2)]
        );
        assert_eq!(topology.partition_count(), 2);
        assert_eq!(
            topology.members_with_partition(PartitionId::new(2)),
            vec![&MemberId::from(1), &MemberId::from(3)]
        );
        assert_eq!(topology.min_replication_factor(), 2);
    }

    #[test]
    fn test_merge_prefers_higher_version() {
        let old = topology();
        let new = old
            .clone()
            .start_topology_change(vec![TopologyChangeOperation::member_join(4)])
            .unwrap();
        assert_eq!(old.clone().merge(new.clone()), new);
        assert_eq!(new.clone().merge(old), new);
    }

    #[test]
    fn test_merge_same_version_takes_newer_member() {
        let base = topology();
        let updated = base
            .clone()
            .update_member(&MemberId::from(2), |m| m.to_leaving());
        let merged = base.merge(updated);
        assert_eq!(
            merged.get_member(&MemberId::from(2)).map(|m| m.status),
            Some(MemberStatus::Leaving)
        );
    }

    #[test]
    fn test_merge_keeps_member_removed_by_newer_plan_step() {
        let base = ClusterTopology::init()
            .add_member(MemberId::from(1), member(&[1]))
            .add_member(MemberId::from(3), member(&[]))
            .start_topology_change(vec![
                TopologyChangeOperation::member_leave(3),
                TopologyChangeOperation::member_join(4),
            ])
            .unwrap();
        let left = base
            .clone()
            .advance_topology_change(|t| {
                t.update_member(&MemberId::from(3), |m| m.to_leaving().to_left())
            })
            .unwrap();
        assert_eq!(left.version(), base.version());

        let merged = left.clone().merge(base.clone());
        assert_eq!(merged, left);
        assert!(!merged.has_member(&MemberId::from(3)));

        assert_eq!(base.merge(left.clone()), left);
    }

    #[test]
    fn test_encode_decode() {
        let topology = topology()
            .start_topology_change(vec![TopologyChangeOperation::member_join(4)])
            .unwrap();
        let bytes = topology.encode().unwrap();
        assert_eq!(ClusterTopology::decode(&bytes).unwrap(), topology);
    }
}
