//! Immutable topology value types.
//!
//! [`ClusterTopology`] is the single owned root. Members, partitions, the
//! pending plan and the last finished change are plain values reachable only
//! through it; operations refer to members by id, never by pointer.

mod member;
mod plan;
mod topology;

pub use member::{MemberState, MemberStatus, PartitionState, PartitionStatus};
pub use plan::{ChangeStatus, ClusterChangePlan, CompletedChange, CompletedOperation};
pub use topology::ClusterTopology;
