//! Recording executors and topology fixtures for testing.
//!
//! The executors record every call and can be told to fail the next `n`
//! calls, which is enough to drive the execution driver through its retry
//! and failure paths without a replication layer.
//!
//! # Usage
//!
//! This module is available when the `test-utilities` feature is enabled,
//! or during unit tests:
//!
//! ```toml
//! [dev-dependencies]
//! cluster-topology = { path = ".", features = ["test-utilities"] }
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::state::{ClusterTopology, MemberState, PartitionState};
use super::traits::{PartitionChangeExecutor, TopologyMembershipChangeExecutor};
use crate::types::{MemberId, PartitionId, Priority};

/// Fails a configurable number of upcoming calls.
#[derive(Debug, Default)]
struct FailureInjector {
    remaining: Mutex<Option<(usize, String)>>,
}

impl FailureInjector {
    async fn fail_times(&self, times: usize, reason: &str) {
        *self.remaining.lock().await = Some((times, reason.to_string()));
    }

    async fn check(&self) -> Result<(), String> {
        let mut remaining = self.remaining.lock().await;
        match remaining.take() {
            Some((times, reason)) if times > 0 => {
                if times > 1 {
                    *remaining = Some((times - 1, reason.clone()));
                }
                Err(reason)
            }
            _ => Ok(()),
        }
    }
}

/// Partition executor that records every call.
#[derive(Debug, Default)]
pub struct RecordingPartitionExecutor {
    joins: Mutex<Vec<(PartitionId, BTreeMap<MemberId, Priority>)>>,
    leaves: Mutex<Vec<PartitionId>>,
    priority_changes: Mutex<Vec<(PartitionId, Priority)>>,
    force_reconfigures: Mutex<Vec<(PartitionId, Vec<MemberId>)>>,
    failures: FailureInjector,
}

impl RecordingPartitionExecutor {
    /// Fail the next call with `reason`.
    pub async fn fail_next(&self, reason: &str) {
        self.failures.fail_times(1, reason).await;
    }

    /// Fail the next `times` calls with `reason`.
    pub async fn fail_times(&self, times: usize, reason: &str) {
        self.failures.fail_times(times, reason).await;
    }

    pub async fn joins(&self) -> Vec<(PartitionId, BTreeMap<MemberId, Priority>)> {
        self.joins.lock().await.clone()
    }

    pub async fn leaves(&self) -> Vec<PartitionId> {
        self.leaves.lock().await.clone()
    }

    pub async fn priority_changes(&self) -> Vec<(PartitionId, Priority)> {
        self.priority_changes.lock().await.clone()
    }

    pub async fn force_reconfigures(&self) -> Vec<(PartitionId, Vec<MemberId>)> {
        self.force_reconfigures.lock().await.clone()
    }
}

#[async_trait]
impl PartitionChangeExecutor for RecordingPartitionExecutor {
    async fn join(
        &self,
        partition_id: PartitionId,
        members_with_priority: BTreeMap<MemberId, Priority>,
    ) -> Result<(), String> {
        self.failures.check().await?;
        self.joins
            .lock()
            .await
            .push((partition_id, members_with_priority));
        Ok(())
    }

    async fn leave(&self, partition_id: PartitionId) -> Result<(), String> {
        self.failures.check().await?;
        self.leaves.lock().await.push(partition_id);
        Ok(())
    }

    async fn reconfigure_priority(
        &self,
        partition_id: PartitionId,
        priority: Priority,
    ) -> Result<(), String> {
        self.failures.check().await?;
        self.priority_changes
            .lock()
            .await
            .push((partition_id, priority));
        Ok(())
    }

    async fn force_reconfigure(
        &self,
        partition_id: PartitionId,
        members: Vec<MemberId>,
    ) -> Result<(), String> {
        self.failures.check().await?;
        self.force_reconfigures
            .lock()
            .await
            .push((partition_id, members));
        Ok(())
    }
}

/// Membership executor that records every call.
#[derive(Debug, Default)]
pub struct RecordingMembershipExecutor {
    added: Mutex<Vec<MemberId>>,
    removed: Mutex<Vec<MemberId>>,
    failures: FailureInjector,
}

impl RecordingMembershipExecutor {
    pub async fn fail_next(&self, reason: &str) {
        self.failures.fail_times(1, reason).await;
    }

    pub async fn fail_times(&self, times: usize, reason: &str) {
        self.failures.fail_times(times, reason).await;
    }

    pub async fn added(&self) -> Vec<MemberId> {
        self.added.lock().await.clone()
    }

    pub async fn removed(&self) -> Vec<MemberId> {
        self.removed.lock().await.clone()
    }
}

#[async_trait]
impl TopologyMembershipChangeExecutor for RecordingMembershipExecutor {
    async fn add_broker(&self, member_id: &MemberId) -> Result<(), String> {
        self.failures.check().await?;
        self.added.lock().await.push(member_id.clone());
        Ok(())
    }

    async fn remove_broker(&self, member_id: &MemberId) -> Result<(), String> {
        self.failures.check().await?;
        self.removed.lock().await.push(member_id.clone());
        Ok(())
    }
}

/// Builder for initialized topologies with active members.
///
/// ```rust,ignore
/// let topology = TopologyBuilder::new()
///     .member(1, &[1, 2])
///     .member(2, &[2])
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    members: BTreeMap<MemberId, MemberState>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active member replicating `partitions`, each with priority 1.
    pub fn member(self, member_id: u32, partitions: &[u32]) -> Self {
        let with_priorities: Vec<(u32, Priority)> = partitions.iter().map(|p| (*p, 1)).collect();
        self.member_with_priorities(member_id, &with_priorities)
    }

    /// Add an active member replicating the given `(partition, priority)` pairs.
    pub fn member_with_priorities(mut self, member_id: u32, partitions: &[(u32, Priority)]) -> Self {
        let partitions = partitions
            .iter()
            .map(|(partition, priority)| {
                (PartitionId::new(*partition), PartitionState::active(*priority))
            })
            .collect();
        self.members
            .insert(MemberId::from(member_id), MemberState::active(partitions));
        self
    }

    pub fn build(self) -> ClusterTopology {
        self.members
            .into_iter()
            .fold(ClusterTopology::init(), |topology, (id, state)| {
                topology.add_member(id, state)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_injection_counts_down() {
        let executor = RecordingPartitionExecutor::default();
        executor.fail_times(2, "boom").await;

        assert_eq!(executor.leave(PartitionId::new(1)).await, Err("boom".to_string()));
        assert_eq!(executor.leave(PartitionId::new(1)).await, Err("boom".to_string()));
        assert_eq!(executor.leave(PartitionId::new(1)).await, Ok(()));
        assert_eq!(executor.leaves().await, vec![PartitionId::new(1)]);
    }

    #[test]
    fn test_builder_creates_active_members() {
        let topology = TopologyBuilder::new().member(1, &[1, 2]).member(2, &[2]).build();
        assert_eq!(topology.version(), 0);
        assert_eq!(topology.members().len(), 2);
        assert_eq!(topology.members_with_partition(PartitionId::new(2)).len(), 2);
        assert!(topology.members().values().all(|m| m.is_active()));
    }
}
