//! Collaborator traits the topology engine depends on.
//!
//! These traits abstract everything outside the coordination core:
//! - The gossip/replication layer that owns the agreed [`ClusterTopology`]
//! - The replication layer that actually joins and leaves partitions
//! - The membership layer that adds and removes brokers
//!
//! # Available Implementations
//!
//! - [`InMemoryTopologyManager`](super::InMemoryTopologyManager): single-process manager
//! - [`NoopPartitionChangeExecutor`](super::NoopPartitionChangeExecutor) and
//!   [`NoopMembershipChangeExecutor`](super::NoopMembershipChangeExecutor): used for simulation
//! - `RecordingPartitionExecutor` / `RecordingMembershipExecutor`: test doubles
//!   (`test-utilities` feature)
//!
//! Executors report failures as plain strings; appliers wrap them into
//! [`TopologyError::ExecutionFailed`](super::TopologyError::ExecutionFailed)
//! together with the operation that failed.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::error::TopologyResult;
use super::state::ClusterTopology;
use crate::types::{MemberId, PartitionId, Priority};

/// A fallible, atomic topology mutation handed to the manager.
pub type TopologyUpdater =
    Box<dyn FnOnce(ClusterTopology) -> TopologyResult<ClusterTopology> + Send>;

/// Owner of the locally known, cluster-wide agreed topology.
#[async_trait]
pub trait ClusterTopologyManager: Send + Sync {
    /// Get the topology as currently known by this member.
    async fn get_cluster_topology(&self) -> TopologyResult<ClusterTopology>;

    /// Atomically apply `updater` to the current topology and disseminate the
    /// result.
    ///
    /// If `updater` fails, the topology is left untouched and its error is
    /// returned.
    async fn update_cluster_topology(
        &self,
        updater: TopologyUpdater,
    ) -> TopologyResult<ClusterTopology>;
}

/// Partition membership primitives of the replication layer.
#[async_trait]
pub trait PartitionChangeExecutor: Send + Sync {
    /// Start replicating `partition_id` locally, with the given replica set
    /// (including this member) and priorities.
    async fn join(
        &self,
        partition_id: PartitionId,
        members_with_priority: BTreeMap<MemberId, Priority>,
    ) -> Result<(), String>;

    /// Stop replicating `partition_id` locally.
    async fn leave(&self, partition_id: PartitionId) -> Result<(), String>;

    /// Change the local replica's priority.
    async fn reconfigure_priority(
        &self,
        partition_id: PartitionId,
        priority: Priority,
    ) -> Result<(), String>;

    /// Force the replica set of `partition_id` down to `members`, without
    /// the consent of the removed replicas.
    async fn force_reconfigure(
        &self,
        partition_id: PartitionId,
        members: Vec<MemberId>,
    ) -> Result<(), String>;
}

/// Cluster membership primitives.
#[async_trait]
pub trait TopologyMembershipChangeExecutor: Send + Sync {
    /// Make `member_id` a member of the cluster.
    async fn add_broker(&self, member_id: &MemberId) -> Result<(), String>;

    /// Remove `member_id` from the cluster.
    async fn remove_broker(&self, member_id: &MemberId) -> Result<(), String>;
}
