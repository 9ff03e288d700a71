//! Per-member state: lifecycle and the partitions the member replicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{PartitionId, Priority};

/// Lifecycle of a member.
///
/// ```text
/// Uninitialized -> Joining -> Active -> Leaving -> Left
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Uninitialized,
    Joining,
    Active,
    Leaving,
    Left,
}

/// Lifecycle of a partition replica on a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartitionStatus {
    Joining,
    Active,
    Leaving,
}

/// A member's replica of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionState {
    pub status: PartitionStatus,
    /// Leadership preference; higher is preferred. Not used for correctness.
    pub priority: Priority,
}

impl PartitionState {
    pub fn joining(priority: Priority) -> Self {
        Self {
            status: PartitionStatus::Joining,
            priority,
        }
    }

    pub fn active(priority: Priority) -> Self {
        Self {
            status: PartitionStatus::Active,
            priority,
        }
    }

    pub fn to_active(self) -> Self {
        Self {
            status: PartitionStatus::Active,
            ..self
        }
    }

    pub fn to_leaving(self) -> Self {
        Self {
            status: PartitionStatus::Leaving,
            ..self
        }
    }

    pub fn with_priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }
}

/// State of one cluster member.
///
/// Every mutator returns a new value with `version` incremented and
/// `last_updated` refreshed, so gossip can tell which copy is newer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberState {
    pub version: i64,
    pub last_updated: DateTime<Utc>,
    pub status: MemberStatus,
    pub partitions: BTreeMap<PartitionId, PartitionState>,
}

impl MemberState {
    /// The state of a member the topology has never seen.
    pub fn uninitialized() -> Self {
        Self {
            version: 0,
            last_updated: DateTime::<Utc>::default(),
            status: MemberStatus::Uninitialized,
            partitions: BTreeMap::new(),
        }
    }

    /// An active member replicating `partitions`.
    pub fn active(partitions: BTreeMap<PartitionId, PartitionState>) -> Self {
        Self {
            version: 0,
            last_updated: Utc::now(),
            status: MemberStatus::Active,
            partitions,
        }
    }

    fn bump(self) -> Self {
        Self {
            version: self.version + 1,
            last_updated: Utc::now(),
            ..self
        }
    }

    fn with_status(self, status: MemberStatus) -> Self {
        Self { status, ..self }.bump()
    }

    pub fn to_joining(self) -> Self {
        self.with_status(MemberStatus::Joining)
    }

    pub fn to_active(self) -> Self {
        self.with_status(MemberStatus::Active)
    }

    pub fn to_leaving(self) -> Self {
        self.with_status(MemberStatus::Leaving)
    }

    /// Mark the member as gone. Appliers only call this after checking the
    /// member owns no partitions.
    pub fn to_left(self) -> Self {
        self.with_status(MemberStatus::Left)
    }

    pub fn add_partition(mut self, partition_id: PartitionId, state: PartitionState) -> Self {
        self.partitions.insert(partition_id, state);
        self.bump()
    }

    pub fn remove_partition(mut self, partition_id: PartitionId) -> Self {
        self.partitions.remove(&partition_id);
        self.bump()
    }

    /// Update the replica of `partition_id` in place. No-op if the member
    /// does not hold the partition.
    pub fn update_partition(
        mut self,
        partition_id: PartitionId,
        f: impl FnOnce(PartitionState) -> PartitionState,
    ) -> Self {
        if let Some(current) = self.partitions.get(&partition_id).copied() {
            self.partitions.insert(partition_id, f(current));
            self.bump()
        } else {
            self
        }
    }

    pub fn has_partition(&self, partition_id: PartitionId) -> bool {
        self.partitions.contains_key(&partition_id)
    }

    pub fn get_partition(&self, partition_id: PartitionId) -> Option<&PartitionState> {
        self.partitions.get(&partition_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_bumps_version() {
        let state = MemberState::uninitialized().to_joining();
        assert_eq!(state.status, MemberStatus::Joining);
        assert_eq!(state.version, 1);

        let state = state.to_active().to_leaving().to_left();
        assert_eq!(state.status, MemberStatus::Left);
        assert_eq!(state.version, 4);
    }

    #[test]
    fn test_partition_mutators() {
        let state = MemberState::active(BTreeMap::new())
            .add_partition(PartitionId::new(1), PartitionState::joining(2));
        assert_eq!(
            state.get_partition(PartitionId::new(1)),
            Some(&PartitionState::joining(2))
        );

        let state = state.update_partition(PartitionId::new(1), |p| p.to_active().with_priority(5));
        assert_eq!(
            state.get_partition(PartitionId::new(1)),
            Some(&PartitionState::active(5))
        );

        let state = state.remove_partition(PartitionId::new(1));
        assert!(!state.has_partition(PartitionId::new(1)));
    }

    #[test]
    fn test_update_missing_partition_is_noop() {
        let state = MemberState::active(BTreeMap::new());
        let updated = state.clone().update_partition(PartitionId::new(3), |p| p.to_leaving());
        assert_eq!(updated, state);
    }
}
