//! Cluster topology management.
//!
//! The topology is a replicated, versioned value describing which members
//! exist and which partitions each member replicates. Changing it safely is
//! a two step affair: the coordinator plans and validates a change, then
//! every member's execution driver applies the operations that name it.
//!
//! # Architecture
//!
//! ```text
//!   management request ──▶ TopologyManagementApi
//!                                   │
//!                                   ▼
//!                      transformer (request → operations)
//!                                   │
//!                                   ▼
//!              TopologyChangeCoordinator ── simulate ──▶ dry-run result
//!                                   │
//!                                   ▼ commit plan
//!                         ClusterTopologyManager ◀── gossip (merge)
//!                                   │
//!             ┌─────────────────────┼─────────────────────┐
//!             ▼                     ▼                     ▼
//!       driver (member 0)     driver (member 1)     driver (member 2)
//!             │                     │                     │
//!             ▼                     ▼                     ▼
//!       appliers ──▶ PartitionChangeExecutor / TopologyMembershipChangeExecutor
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use cluster_topology::cluster::{
//!     AddMembersRequest, InMemoryTopologyManager, TopologyChangeCoordinatorImpl,
//!     TopologyConfig, TopologyManagementApi,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TopologyConfig::from_env()?;
//!     let manager = Arc::new(InMemoryTopologyManager::new(config.initial_topology()?));
//!     let api = TopologyManagementApi::new(TopologyChangeCoordinatorImpl::new(
//!         config.local_member_id.clone(),
//!         manager,
//!     ));
//!
//!     let response = api
//!         .add_members(AddMembersRequest {
//!             members: ["3".into()].into_iter().collect(),
//!             dry_run: true,
//!         })
//!         .await?;
//!     println!("planned: {:?}", response.planned_changes);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod appliers;
mod config;
pub mod coordinator;
pub mod distributor;
pub mod driver;
mod error;
mod executor;
mod manager;
pub mod operations;
pub mod retry;
pub mod state;
mod traits;
pub mod transformers;

#[cfg(any(test, feature = "test-utilities"))]
pub mod mock_executor;

pub use api::{
    AddMembersRequest, ApiResult, CancelChangeRequest, ErrorResponse, ForceScaleDownRequest,
    JoinPartitionRequest, LeavePartitionRequest, ReassignPartitionsRequest, RemoveMembersRequest,
    ScaleMembersRequest, TopologyChangeResponse, TopologyManagementApi,
};
pub use appliers::{TopologyChangeAppliers, TopologyChangeAppliersImpl};
pub use config::{TopologyConfig, TopologyProfile};
pub use coordinator::{
    TopologyChangeCoordinator, TopologyChangeCoordinatorImpl, TopologyChangeResult,
};
pub use distributor::{PartitionDistributor, PartitionMetadata, RoundRobinPartitionDistributor};
pub use driver::{ChangeExecutionDriver, DriverStep};
pub use error::{TopologyError, TopologyResult};
pub use executor::{NoopMembershipChangeExecutor, NoopPartitionChangeExecutor};
pub use manager::InMemoryTopologyManager;
#[cfg(any(test, feature = "test-utilities"))]
pub use mock_executor::{RecordingMembershipExecutor, RecordingPartitionExecutor, TopologyBuilder};
pub use operations::TopologyChangeOperation;
pub use state::{
    ChangeStatus, ClusterChangePlan, ClusterTopology, CompletedChange, MemberState, MemberStatus,
    PartitionState, PartitionStatus,
};
pub use traits::{
    ClusterTopologyManager, PartitionChangeExecutor, TopologyMembershipChangeExecutor,
    TopologyUpdater,
};
pub use transformers::TopologyChangeRequest;
