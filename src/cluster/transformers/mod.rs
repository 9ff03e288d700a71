//! Request transformers.
//!
//! A transformer turns a high-level intent into the ordered list of atomic
//! operations that implement it, validated against the current topology.
//! Transformers are pure: they never touch executors or the live topology,
//! and the same inputs always produce the same list.
//!
//! | Transformer | Produces |
//! |-------------|----------|
//! | [`AddMembersTransformer`] | `MemberJoin` per new member |
//! | [`RemoveMembersTransformer`] | `MemberLeave` per member without partitions |
//! | [`JoinPartitionTransformer`] | a single `PartitionJoin` |
//! | [`LeavePartitionTransformer`] | a single `PartitionLeave` |
//! | [`PartitionReassignRequestTransformer`] | joins, priority changes and leaves per partition |
//! | [`ScaleRequestTransformer`] | member joins, reassignment, member leaves |
//! | [`ForceScaleDownRequestTransformer`] | forced reconfigurations and member removals |
//!
//! Validation here only covers what can be decided from the request itself.
//! Everything that depends on intermediate states (a partition leaving
//! before its replacement joined, a member leaving while still holding
//! partitions) is caught by the coordinator's simulation.

mod force_scale_down;
mod members;
mod partition;
mod reassign;
mod scale;

use super::error::TopologyResult;
use super::operations::TopologyChangeOperation;
use super::state::ClusterTopology;

pub use force_scale_down::ForceScaleDownRequestTransformer;
pub use members::{AddMembersTransformer, RemoveMembersTransformer};
pub use partition::{JoinPartitionTransformer, LeavePartitionTransformer};
pub use reassign::PartitionReassignRequestTransformer;
pub use scale::ScaleRequestTransformer;

/// A topology change request.
pub trait TopologyChangeRequest: Send + Sync {
    /// Compute the operations implementing this request on `topology`.
    fn operations(
        &self,
        topology: &ClusterTopology,
    ) -> TopologyResult<Vec<TopologyChangeOperation>>;

    /// Forced requests may be issued to any member, not only the coordinator.
    fn is_forced(&self) -> bool {
        false
    }
}
