//! The closed set of atomic topology mutations.
//!
//! A change plan is an ordered list of these operations. Each variant names
//! the member that performs it; the execution driver on that member applies
//! it and advances the plan.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{MemberId, PartitionId, Priority};

/// A single step of a topology change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopologyChangeOperation {
    /// A new member joins the cluster.
    MemberJoin { member_id: MemberId },

    /// A member leaves the cluster on its own.
    MemberLeave { member_id: MemberId },

    /// The coordinator removes another member, which may be unreachable.
    MemberRemove {
        member_id: MemberId,
        member_to_remove: MemberId,
    },

    /// A member starts replicating a partition.
    PartitionJoin {
        member_id: MemberId,
        partition_id: PartitionId,
        priority: Priority,
    },

    /// A member stops replicating a partition.
    PartitionLeave {
        member_id: MemberId,
        partition_id: PartitionId,
    },

    /// A member changes its replication priority for a partition.
    PartitionReconfigurePriority {
        member_id: MemberId,
        partition_id: PartitionId,
        priority: Priority,
    },

    /// Forcefully shrink a partition's replica set to `members`.
    PartitionForceReconfigure {
        member_id: MemberId,
        partition_id: PartitionId,
        members: Vec<MemberId>,
    },

    /// An operation this member does not know, e.g. introduced by a newer
    /// version during a rolling update.
    #[serde(other)]
    Unrecognized,
}

impl TopologyChangeOperation {
    pub fn member_join(member_id: impl Into<MemberId>) -> Self {
        TopologyChangeOperation::MemberJoin {
            member_id: member_id.into(),
        }
    }

    pub fn member_leave(member_id: impl Into<MemberId>) -> Self {
        TopologyChangeOperation::MemberLeave {
            member_id: member_id.into(),
        }
    }

    pub fn member_remove(
        coordinator: impl Into<MemberId>,
        member_to_remove: impl Into<MemberId>,
    ) -> Self {
        TopologyChangeOperation::MemberRemove {
            member_id: coordinator.into(),
            member_to_remove: member_to_remove.into(),
        }
    }

    pub fn partition_join(
        member_id: impl Into<MemberId>,
        partition_id: impl Into<PartitionId>,
        priority: Priority,
    ) -> Self {
        TopologyChangeOperation::PartitionJoin {
            member_id: member_id.into(),
            partition_id: partition_id.into(),
            priority,
        }
    }

    pub fn partition_leave(
        member_id: impl Into<MemberId>,
        partition_id: impl Into<PartitionId>,
    ) -> Self {
        TopologyChangeOperation::PartitionLeave {
            member_id: member_id.into(),
            partition_id: partition_id.into(),
        }
    }

    pub fn partition_reconfigure_priority(
        member_id: impl Into<MemberId>,
        partition_id: impl Into<PartitionId>,
        priority: Priority,
    ) -> Self {
        TopologyChangeOperation::PartitionReconfigurePriority {
            member_id: member_id.into(),
            partition_id: partition_id.into(),
            priority,
        }
    }

    pub fn partition_force_reconfigure(
        member_id: impl Into<MemberId>,
        partition_id: impl Into<PartitionId>,
        members: Vec<MemberId>,
    ) -> Self {
        TopologyChangeOperation::PartitionForceReconfigure {
            member_id: member_id.into(),
            partition_id: partition_id.into(),
            members,
        }
    }

    /// The member that performs this operation.
    ///
    /// `None` only for [`TopologyChangeOperation::Unrecognized`].
    pub fn member_id(&self) -> Option<&MemberId> {
        match self {
            TopologyChangeOperation::MemberJoin { member_id }
            | TopologyChangeOperation::MemberLeave { member_id }
            | TopologyChangeOperation::MemberRemove { member_id, .. }
            | TopologyChangeOperation::PartitionJoin { member_id, .. }
            | TopologyChangeOperation::PartitionLeave { member_id, .. }
            | TopologyChangeOperation::PartitionReconfigurePriority { member_id, .. }
            | TopologyChangeOperation::PartitionForceReconfigure { member_id, .. } => {
                Some(member_id)
            }
            TopologyChangeOperation::Unrecognized => None,
        }
    }

    /// The partition this operation touches, if any.
    pub fn partition_id(&self) -> Option<PartitionId> {
        match self {
            TopologyChangeOperation::PartitionJoin { partition_id, .. }
            | TopologyChangeOperation::PartitionLeave { partition_id, .. }
            | TopologyChangeOperation::PartitionReconfigurePriority { partition_id, .. }
            | TopologyChangeOperation::PartitionForceReconfigure { partition_id, .. } => {
                Some(*partition_id)
            }
            _ => None,
        }
    }
}

impl fmt::Display for TopologyChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyChangeOperation::MemberJoin { member_id } => {
                write!(f, "MemberJoin({})", member_id)
            }
            TopologyChangeOperation::MemberLeave { member_id } => {
                write!(f, "MemberLeave({})", member_id)
            }
            TopologyChangeOperation::MemberRemove {
                member_id,
                member_to_remove,
            } => write!(f, "MemberRemove({} removes {})", member_id, member_to_remove),
            TopologyChangeOperation::PartitionJoin {
                member_id,
                partition_id,
                priority,
            } => write!(
                f,
                "PartitionJoin({}, partition {}, priority {})",
                member_id, partition_id, priority
            ),
            TopologyChangeOperation::PartitionLeave {
                member_id,
                partition_id,
            } => write!(f, "PartitionLeave({}, partition {})", member_id, partition_id),
            TopologyChangeOperation::PartitionReconfigurePriority {
                member_id,
                partition_id,
                priority,
            } => write!(
                f,
                "PartitionReconfigurePriority({}, partition {}, priority {})",
                member_id, partition_id, priority
            ),
            TopologyChangeOperation::PartitionForceReconfigure {
                member_id,
                partition_id,
                members,
            } => {
                let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(
                    f,
                    "PartitionForceReconfigure({}, partition {}, members [{}])",
                    member_id,
                    partition_id,
                    members.join(", ")
                )
            }
            TopologyChangeOperation::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_of_remove_is_coordinator() {
        let op = TopologyChangeOperation::member_remove(1, 3);
        assert_eq!(op.member_id(), Some(&MemberId::from(1)));
    }

    #[test]
    fn test_partition_id() {
        let op = TopologyChangeOperation::partition_leave(2, PartitionId::new(5));
        assert_eq!(op.partition_id(), Some(PartitionId::new(5)));
        assert_eq!(TopologyChangeOperation::member_join(2).partition_id(), None);
    }

    #[test]
    fn test_unknown_operation_type_decodes_as_unrecognized() {
        let json = r#"{"type":"PartitionScaleUp","member_id":"1","desired_count":6}"#;
        let op: TopologyChangeOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op, TopologyChangeOperation::Unrecognized);
        assert_eq!(op.member_id(), None);
    }

    #[test]
    fn test_display() {
        let op = TopologyChangeOperation::partition_force_reconfigure(
            1,
            PartitionId::new(2),
            vec![MemberId::from(1), MemberId::from(3)],
        );
        assert_eq!(
            op.to_string(),
            "PartitionForceReconfigure(1, partition 2, members [1, 3])"
        );
    }
}
