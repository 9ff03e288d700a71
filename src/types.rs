//! Type-safe identifiers for cluster members and partitions.
//!
//! These newtypes keep member ids and partition ids from being mixed up
//! with each other or with plain integers (priorities, versions, change ids).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifier of a cluster member.
///
/// Member ids are strings on the wire. Most deployments use numeric ids
/// (`"0"`, `"1"`, ...), so ordering is numeric-first: ids that parse as
/// integers compare numerically and sort before any non-numeric id, which
/// compare lexicographically. This is the order used to pick the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    /// Create a member id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        MemberId(id.into())
    }

    /// Get the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for MemberId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for MemberId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        MemberId(id.to_string())
    }
}

impl From<String> for MemberId {
    fn from(id: String) -> Self {
        MemberId(id)
    }
}

impl From<u32> for MemberId {
    fn from(id: u32) -> Self {
        MemberId(id.to_string())
    }
}

impl From<i32> for MemberId {
    fn from(id: i32) -> Self {
        MemberId(id.to_string())
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a partition. Partitions are numbered from 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PartitionId(pub u32);

impl PartitionId {
    /// Create a new partition id from a raw value.
    #[inline]
    pub const fn new(value: u32) -> Self {
        PartitionId(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for PartitionId {
    fn from(value: u32) -> Self {
        PartitionId(value)
    }
}

impl From<PartitionId> for u32 {
    fn from(id: PartitionId) -> Self {
        id.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Replication priority of a member for a partition. Higher wins leadership.
pub type Priority = i32;

/// Identifier of a topology change plan.
pub type ChangeId = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_numeric_ordering() {
        let mut ids: Vec<MemberId> = vec!["10".into(), "2".into(), "1".into()];
        ids.sort();
        assert_eq!(ids, vec![MemberId::from(1), MemberId::from(2), MemberId::from(10)]);
    }

    #[test]
    fn test_member_id_numeric_before_named() {
        let numeric = MemberId::from("7");
        let named = MemberId::from("broker-a");
        assert!(numeric < named);
        assert!(MemberId::from("broker-a") < MemberId::from("broker-b"));
    }

    #[test]
    fn test_member_id_serializes_as_string() {
        let json = serde_json::to_string(&MemberId::from(3)).unwrap();
        assert_eq!(json, "\"3\"");
    }

    #[test]
    fn test_partition_id_display() {
        assert_eq!(PartitionId::new(4).to_string(), "4");
        assert_eq!(u32::from(PartitionId::from(9u32)), 9);
    }
}
