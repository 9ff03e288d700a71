//! # cluster-topology
//! Coordination engine for changing the membership and partition placement
//! of a partitioned, replicated cluster.
//!
//! The cluster topology is a versioned value replicated to every member by
//! gossip. Operators change it through management requests: add or remove
//! members, move a partition replica, redistribute every partition, scale to
//! a member set, or force the cluster down to a set of survivors. Each
//! request is turned into an ordered list of small operations, simulated
//! against the current topology, and only committed as a plan if the whole
//! list would succeed. Members then apply the operations that name them, one
//! at a time, recording progress in the topology itself.
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use cluster_topology::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     telemetry::init_logging(telemetry::LogFormat::from_env())?;
//!
//!     let config = TopologyConfig::from_env()?;
//!     let manager = Arc::new(InMemoryTopologyManager::new(config.initial_topology()?));
//!     let api = TopologyManagementApi::new(TopologyChangeCoordinatorImpl::new(
//!         config.local_member_id.clone(),
//!         manager.clone(),
//!     ));
//!
//!     // Plan the change and look at it before committing.
//!     let request = ScaleMembersRequest {
//!         members: ["0".into(), "1".into(), "2".into(), "3".into()].into_iter().collect(),
//!         replication_factor: None,
//!         dry_run: true,
//!     };
//!     let preview = api.scale_members(request.clone()).await?;
//!     println!("{} operations planned", preview.planned_changes.len());
//!
//!     api.scale_members(ScaleMembersRequest { dry_run: false, ..request }).await?;
//!
//!     // Every member runs a driver against its own replica of the topology.
//!     let appliers = TopologyChangeAppliersImpl::new(
//!         Arc::new(NoopPartitionChangeExecutor),
//!         Arc::new(NoopMembershipChangeExecutor),
//!     );
//!     let driver = ChangeExecutionDriver::from_config(&config, manager, Arc::new(appliers));
//!     driver.run_to_completion().await;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod cluster;
pub mod constants;
pub mod error;
pub mod telemetry;
pub mod types;

pub mod prelude {
    //! Commonly used types.
    pub use crate::cluster::{
        AddMembersRequest, CancelChangeRequest, ChangeExecutionDriver, ClusterTopology,
        ClusterTopologyManager, DriverStep, ErrorResponse, ForceScaleDownRequest,
        InMemoryTopologyManager, JoinPartitionRequest, LeavePartitionRequest,
        NoopMembershipChangeExecutor, NoopPartitionChangeExecutor, ReassignPartitionsRequest,
        RemoveMembersRequest, ScaleMembersRequest, TopologyChangeAppliersImpl,
        TopologyChangeCoordinator, TopologyChangeCoordinatorImpl, TopologyChangeOperation,
        TopologyConfig, TopologyError, TopologyManagementApi, TopologyProfile, TopologyResult,
    };
    pub use crate::error::ErrorCode;
    pub use crate::telemetry;
    pub use crate::types::{ChangeId, MemberId, PartitionId, Priority};
}
