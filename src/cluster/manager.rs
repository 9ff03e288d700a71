//! In-memory [`ClusterTopologyManager`].
//!
//! Holds the topology of a single process behind a `tokio` `RwLock`.
//! `update_cluster_topology` runs the updater under the write lock, so the
//! read-modify-write is atomic with respect to every other update on this
//! manager. Dissemination is left to whoever calls [`InMemoryTopologyManager::offer`]
//! with topologies received from peers.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::TopologyResult;
use super::state::ClusterTopology;
use super::traits::{ClusterTopologyManager, TopologyUpdater};

#[derive(Debug, Default)]
pub struct InMemoryTopologyManager {
    topology: RwLock<ClusterTopology>,
}

impl InMemoryTopologyManager {
    pub fn new(topology: ClusterTopology) -> Self {
        Self {
            topology: RwLock::new(topology),
        }
    }

    /// Merge a topology received from a peer into the local one.
    ///
    /// Returns the merged value.
    pub async fn offer(&self, gossiped: ClusterTopology) -> ClusterTopology {
        let mut topology = self.topology.write().await;
        let merged = topology.clone().merge(gossiped);
        if merged != *topology {
            debug!(
                from_version = topology.version(),
                to_version = merged.version(),
                "Accepted gossiped topology"
            );
            *topology = merged.clone();
        }
        merged
    }
}

#[async_trait]
impl ClusterTopologyManager for InMemoryTopologyManager {
    async fn get_cluster_topology(&self) -> TopologyResult<ClusterTopology> {
        Ok(self.topology.read().await.clone())
    }

    async fn update_cluster_topology(
        &self,
        updater: TopologyUpdater,
    ) -> TopologyResult<ClusterTopology> {
        let mut topology = self.topology.write().await;
        let updated = updater(topology.clone())?;
        *topology = updated.clone();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::error::TopologyError;
    use crate::cluster::operations::TopologyChangeOperation;
    use crate::types::MemberId;

    #[tokio::test]
    async fn test_failed_update_leaves_topology_untouched() {
        let manager = InMemoryTopologyManager::new(ClusterTopology::init());

        let result = manager
            .update_cluster_topology(Box::new(
                |_: ClusterTopology| -> TopologyResult<ClusterTopology> {
                    Err(TopologyError::Internal("nope".into()))
                },
            ))
            .await;
        assert!(result.is_err());
        assert_eq!(
            manager.get_cluster_topology().await.unwrap(),
            ClusterTopology::init()
        );
    }

    #[tokio::test]
    async fn test_update_is_visible() {
        let manager = InMemoryTopologyManager::new(ClusterTopology::init());
        manager
            .update_cluster_topology(Box::new(|topology: ClusterTopology| {
                Ok(topology.update_member(&MemberId::from(1), |m| m.to_active()))
            }))
            .await
            .unwrap();

        let topology = manager.get_cluster_topology().await.unwrap();
        assert!(topology.has_member(&MemberId::from(1)));
    }

    #[tokio::test]
    async fn test_offer_keeps_newer_version() {
        let manager = InMemoryTopologyManager::new(ClusterTopology::init());
        let newer = ClusterTopology::init()
            .start_topology_change(vec![TopologyChangeOperation::member_join(1)])
            .unwrap();

        let merged = manager.offer(newer.clone()).await;
        assert_eq!(merged, newer);

        let merged = manager.offer(ClusterTopology::init()).await;
        assert_eq!(merged, newer);
    }
}
