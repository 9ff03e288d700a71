//! Tests for the gossip encoding of topologies and operations.

use cluster_topology::cluster::{
    ChangeStatus, ClusterTopology, MemberStatus, PartitionStatus, TopologyBuilder, TopologyChangeOperation,
};
use cluster_topology::types::{MemberId, PartitionId};
use serde_json::json;

#[test]
fn test_topology_with_pending_plan_survives_encoding() {
    let topology = TopologyBuilder::new()
        .member(1, &[1, 2])
        .member(2, &[1])
        .build()
        .start_topology_change(vec![
            TopologyChangeOperation::partition_join(2, PartitionId::new(2), 1),
            TopologyChangeOperation::partition_force_reconfigure(
                1,
                PartitionId::new(1),
                vec![MemberId::from(1)],
            ),
        ])
        .unwrap();

    let bytes = topology.encode().unwrap();
    let decoded = ClusterTopology::decode(&bytes).unwrap();

    assert_eq!(decoded, topology);
    assert_eq!(decoded.version(), topology.version());
    assert_eq!(
        decoded.next_pending_operation(),
        Some(&TopologyChangeOperation::partition_join(2, PartitionId::new(2), 1))
    );
}

#[test]
fn test_operation_json_shape() {
    let json = serde_json::to_value(TopologyChangeOperation::partition_join(
        3,
        PartitionId::new(7),
        2,
    ))
    .unwrap();
    assert_eq!(
        json,
        json!({
            "type": "PartitionJoin",
            "member_id": "3",
            "partition_id": 7,
            "priority": 2,
        })
    );

    let json = serde_json::to_value(TopologyChangeOperation::member_remove(1, 4)).unwrap();
    assert_eq!(
        json,
        json!({"type": "MemberRemove", "member_id": "1", "member_to_remove": "4"})
    );
}

#[test]
fn test_status_json_names() {
    assert_eq!(serde_json::to_value(MemberStatus::Active).unwrap(), json!("ACTIVE"));
    assert_eq!(serde_json::to_value(PartitionStatus::Joining).unwrap(), json!("JOINING"));
}

#[test]
fn test_failed_change_status_from_peer_decodes() {
    let status: ChangeStatus = serde_json::from_value(json!("FAILED")).unwrap();
    assert_eq!(status, ChangeStatus::Failed);
    assert_eq!(serde_json::to_value(ChangeStatus::InProgress).unwrap(), json!("IN_PROGRESS"));
}

#[test]
fn test_plan_with_operation_from_newer_version_still_decodes() {
    let topology = TopologyBuilder::new()
        .member(1, &[1])
        .build()
        .start_topology_change(vec![TopologyChangeOperation::member_join(2)])
        .unwrap();

    let mut value = serde_json::to_value(&topology).unwrap();
    value["pending_changes"]["pending_operations"][0] =
        json!({"type": "PartitionMigrate", "member_id": "1", "target": "2"});
    let bytes = serde_json::to_vec(&value).unwrap();

    let decoded = ClusterTopology::decode(&bytes).unwrap();
    assert_eq!(
        decoded.next_pending_operation(),
        Some(&TopologyChangeOperation::Unrecognized)
    );
    assert_eq!(decoded.members(), topology.members());
}

#[test]
fn test_decode_garbage_fails() {
    let result = ClusterTopology::decode(b"not a topology");
    assert!(result.is_err());
}
