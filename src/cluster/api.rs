//! Topology management API.
//!
//! Request and response records for the operator-facing surface, and
//! [`TopologyManagementApi`], which maps each request onto a transformer and
//! hands it to a [`TopologyChangeCoordinator`]. The transport (RPC, HTTP)
//! lives outside this crate; every record is `serde` serializable so the
//! transport only has to pick an encoding.
//!
//! Every request carries `dry_run`. A dry run validates and simulates the
//! change and reports the expected topology without committing anything.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::coordinator::{TopologyChangeCoordinator, TopologyChangeResult};
use super::error::TopologyError;
use super::operations::TopologyChangeOperation;
use super::state::{ClusterTopology, MemberState};
use super::transformers::{
    AddMembersTransformer, ForceScaleDownRequestTransformer, JoinPartitionTransformer,
    LeavePartitionTransformer, PartitionReassignRequestTransformer, RemoveMembersTransformer,
    ScaleRequestTransformer, TopologyChangeRequest,
};
use crate::error::ErrorCode;
use crate::types::{ChangeId, MemberId, PartitionId, Priority};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMembersRequest {
    pub members: BTreeSet<MemberId>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveMembersRequest {
    pub members: BTreeSet<MemberId>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPartitionRequest {
    pub member_id: MemberId,
    pub partition_id: PartitionId,
    pub priority: Priority,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePartitionRequest {
    pub member_id: MemberId,
    pub partition_id: PartitionId,
    #[serde(default)]
    pub dry_run: bool,
}

/// Redistribute all partitions over `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignPartitionsRequest {
    pub members: BTreeSet<MemberId>,
    /// Keeps the current replication factor when absent.
    #[serde(default)]
    pub replication_factor: Option<i32>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Scale the cluster to exactly `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleMembersRequest {
    pub members: BTreeSet<MemberId>,
    #[serde(default)]
    pub replication_factor: Option<i32>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Shrink the cluster to `members_to_retain` without the consent of the
/// removed members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceScaleDownRequest {
    pub members_to_retain: BTreeSet<MemberId>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelChangeRequest {
    pub change_id: ChangeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyChangeResponse {
    pub change_id: ChangeId,
    pub current_topology: BTreeMap<MemberId, MemberState>,
    pub expected_topology: BTreeMap<MemberId, MemberState>,
    pub planned_changes: Vec<TopologyChangeOperation>,
}

impl From<TopologyChangeResult> for TopologyChangeResponse {
    fn from(result: TopologyChangeResult) -> Self {
        Self {
            change_id: result.change_id,
            current_topology: result.current_topology.members().clone(),
            expected_topology: result.final_topology.members().clone(),
            planned_changes: result.operations,
        }
    }
}

/// A failed management request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl From<TopologyError> for ErrorResponse {
    fn from(error: TopologyError) -> Self {
        Self {
            code: error.error_code(),
            message: error.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ErrorResponse>;

pub struct TopologyManagementApi<C: TopologyChangeCoordinator> {
    coordinator: C,
}

impl<C: TopologyChangeCoordinator> TopologyManagementApi<C> {
    pub fn new(coordinator: C) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &C {
        &self.coordinator
    }

    async fn handle(
        &self,
        request: &dyn TopologyChangeRequest,
        dry_run: bool,
    ) -> ApiResult<TopologyChangeResponse> {
        let result = if dry_run {
            self.coordinator.simulate_operations(request).await
        } else {
            self.coordinator.apply_operations(request).await
        };
        result.map(TopologyChangeResponse::from).map_err(ErrorResponse::from)
    }

    pub async fn add_members(&self, request: AddMembersRequest) -> ApiResult<TopologyChangeResponse> {
        self.handle(&AddMembersTransformer::new(request.members), request.dry_run)
            .await
    }

    pub async fn remove_members(
        &self,
        request: RemoveMembersRequest,
    ) -> ApiResult<TopologyChangeResponse> {
        self.handle(&RemoveMembersTransformer::new(request.members), request.dry_run)
            .await
    }

    pub async fn join_partition(
        &self,
        request: JoinPartitionRequest,
    ) -> ApiResult<TopologyChangeResponse> {
        let transformer =
            JoinPartitionTransformer::new(request.member_id, request.partition_id, request.priority);
        self.handle(&transformer, request.dry_run).await
    }

    pub async fn leave_partition(
        &self,
        request: LeavePartitionRequest,
    ) -> ApiResult<TopologyChangeResponse> {
        let transformer = LeavePartitionTransformer::new(request.member_id, request.partition_id);
        self.handle(&transformer, request.dry_run).await
    }

    pub async fn reassign_partitions(
        &self,
        request: ReassignPartitionsRequest,
    ) -> ApiResult<TopologyChangeResponse> {
        let transformer =
            PartitionReassignRequestTransformer::new(request.members, request.replication_factor);
        self.handle(&transformer, request.dry_run).await
    }

    pub async fn scale_members(
        &self,
        request: ScaleMembersRequest,
    ) -> ApiResult<TopologyChangeResponse> {
        let transformer = ScaleRequestTransformer::new(request.members, request.replication_factor);
        self.handle(&transformer, request.dry_run).await
    }

    pub async fn force_scale_down(
        &self,
        request: ForceScaleDownRequest,
    ) -> ApiResult<TopologyChangeResponse> {
        let transformer = ForceScaleDownRequestTransformer::new(request.members_to_retain);
        self.handle(&transformer, request.dry_run).await
    }

    pub async fn cancel_topology_change(
        &self,
        request: CancelChangeRequest,
    ) -> ApiResult<ClusterTopology> {
        self.coordinator
            .cancel_change(request.change_id)
            .await
            .map_err(ErrorResponse::from)
    }

    pub async fn get_topology(&self) -> ApiResult<ClusterTopology> {
        self.coordinator
            .get_topology()
            .await
            .map_err(ErrorResponse::from)
    }
}
