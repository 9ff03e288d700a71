//! Topology change coordinator.
//!
//! Turns a [`TopologyChangeRequest`] into a committed change plan:
//!
//! ```text
//!   request
//!      │
//!      ▼
//!  ┌──────────────┐  not coordinator (unless forced)  ──▶ Internal
//!  │ current      │
//!  │ topology     │
//!  └──────┬───────┘
//!         ▼
//!  ┌──────────────┐  transformer error  ──▶ InvalidRequest
//!  │ transform    │  no operations      ──▶ no-op result
//!  └──────┬───────┘
//!         ▼
//!  ┌──────────────┐  uninitialized      ──▶ OperationNotAllowed
//!  │ simulate on  │  change pending     ──▶ ConcurrentModification
//!  │ a copy       │  any applier error  ──▶ InvalidRequest
//!  └──────┬───────┘
//!         ▼
//!  ┌──────────────┐  dry run            ──▶ simulated result
//!  │ commit if    │  live != snapshot   ──▶ ConcurrentModification
//!  │ unchanged    │
//!  └──────────────┘
//! ```
//!
//! Committing only records the plan. The operations are applied afterwards,
//! one at a time, by the [`ChangeExecutionDriver`](super::ChangeExecutionDriver)
//! of the member each operation names.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::appliers::{TopologyChangeAppliers, TopologyChangeAppliersImpl};
use super::error::{TopologyError, TopologyResult};
use super::operations::TopologyChangeOperation;
use super::state::ClusterTopology;
use super::traits::ClusterTopologyManager;
use super::transformers::TopologyChangeRequest;
use crate::types::{ChangeId, MemberId};

/// The coordinator of a topology: its lowest `Active` member.
pub fn coordinator_of(topology: &ClusterTopology) -> Option<MemberId> {
    topology
        .members()
        .iter()
        .find(|(_, member)| member.is_active())
        .map(|(member_id, _)| member_id.clone())
}

/// The coordinator among an explicit member set: its lowest member.
pub fn coordinator_of_set(members: &BTreeSet<MemberId>) -> Option<MemberId> {
    members.first().cloned()
}

/// Outcome of an accepted (or simulated) topology change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyChangeResult {
    /// Topology the request was validated against.
    pub current_topology: ClusterTopology,
    /// Topology once every operation has been applied.
    pub final_topology: ClusterTopology,
    pub change_id: ChangeId,
    pub operations: Vec<TopologyChangeOperation>,
}

#[async_trait]
pub trait TopologyChangeCoordinator: Send + Sync {
    /// The topology as currently known by this member.
    async fn get_topology(&self) -> TopologyResult<ClusterTopology>;

    /// Validate `request` and commit its change plan.
    async fn apply_operations(
        &self,
        request: &dyn TopologyChangeRequest,
    ) -> TopologyResult<TopologyChangeResult>;

    /// Validate `request` without committing anything.
    async fn simulate_operations(
        &self,
        request: &dyn TopologyChangeRequest,
    ) -> TopologyResult<TopologyChangeResult>;

    /// Drop the not yet applied operations of change `change_id`.
    async fn cancel_change(&self, change_id: ChangeId) -> TopologyResult<ClusterTopology>;
}

pub struct TopologyChangeCoordinatorImpl<M: ClusterTopologyManager> {
    local_member_id: MemberId,
    manager: Arc<M>,
}

impl<M: ClusterTopologyManager> TopologyChangeCoordinatorImpl<M> {
    pub fn new(local_member_id: MemberId, manager: Arc<M>) -> Self {
        Self {
            local_member_id,
            manager,
        }
    }

    pub fn local_member_id(&self) -> &MemberId {
        &self.local_member_id
    }

    async fn handle(
        &self,
        request: &dyn TopologyChangeRequest,
        dry_run: bool,
    ) -> TopologyResult<TopologyChangeResult> {
        let current = self.manager.get_cluster_topology().await?;

        if !request.is_forced() {
            let coordinator = coordinator_of(&current);
            if coordinator.as_ref() != Some(&self.local_member_id) {
                return Err(TopologyError::Internal(format!(
                    "Expected to handle the topology change request on the coordinator {}, but this member is {}",
                    coordinator
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "<none>".to_string()),
                    self.local_member_id
                )));
            }
        }

        let operations = request
            .operations(&current)
            .map_err(TopologyError::into_invalid_request)?;

        if operations.is_empty() {
            let change_id = current.last_change_id();
            return Ok(TopologyChangeResult {
                final_topology: current.clone(),
                current_topology: current,
                change_id,
                operations,
            });
        }

        let final_topology = simulate(&current, &operations).await?;
        let change_id = final_topology.last_change_id();

        if dry_run {
            debug!(change_id, operations = operations.len(), "Simulated topology change");
            return Ok(TopologyChangeResult {
                current_topology: current,
                final_topology,
                change_id,
                operations,
            });
        }

        let snapshot = current.clone();
        let planned = operations.clone();
        let committed = self
            .manager
            .update_cluster_topology(Box::new(move |live: ClusterTopology| {
                if live != snapshot {
                    return Err(TopologyError::ConcurrentModification(
                        "Expected to start the topology change, but the topology changed while the request was validated. Retry the request".into(),
                    ));
                }
                live.start_topology_change(planned)
            }))
            .await?;

        let change_id = committed
            .pending_changes()
            .map(|plan| plan.id)
            .unwrap_or(change_id);
        info!(
            change_id,
            operations = operations.len(),
            "Started topology change"
        );

        Ok(TopologyChangeResult {
            current_topology: current,
            final_topology,
            change_id,
            operations,
        })
    }
}

/// Run `operations` against a copy of `topology` with no-op executors.
///
/// Returns the topology after the whole plan completed. Nothing outside the
/// copy is touched.
pub async fn simulate(
    topology: &ClusterTopology,
    operations: &[TopologyChangeOperation],
) -> TopologyResult<ClusterTopology> {
    if topology.is_uninitialized() {
        return Err(TopologyError::OperationNotAllowed(
            "Expected to change the cluster topology, but the topology is not initialized yet"
                .into(),
        ));
    }
    if let Some(plan) = topology.pending_changes().filter(|_| topology.has_pending_changes()) {
        return Err(TopologyError::ConcurrentModification(format!(
            "Expected to start a topology change, but change {} is still in progress",
            plan.id
        )));
    }

    let appliers = TopologyChangeAppliersImpl::simulation();
    let mut simulated = topology.clone().start_topology_change(operations.to_vec())?;

    while let Some(operation) = simulated.next_pending_operation().cloned() {
        debug!(operation = %operation, "Simulating operation");
        let mut applier = appliers.get_applier(&operation);

        let init = applier
            .init(&simulated)
            .map_err(TopologyError::into_invalid_request)?;
        simulated = init(simulated);

        let apply = applier
            .apply()
            .await
            .map_err(TopologyError::into_invalid_request)?;
        simulated = simulated
            .advance_topology_change(apply)
            .map_err(TopologyError::into_invalid_request)?;
    }

    Ok(simulated)
}

#[async_trait]
impl<M: ClusterTopologyManager> TopologyChangeCoordinator for TopologyChangeCoordinatorImpl<M> {
    async fn get_topology(&self) -> TopologyResult<ClusterTopology> {
        self.manager.get_cluster_topology().await
    }

    async fn apply_operations(
        &self,
        request: &dyn TopologyChangeRequest,
    ) -> TopologyResult<TopologyChangeResult> {
        self.handle(request, false).await.inspect_err(|e| {
            warn!(error = %e, "Rejected topology change request");
        })
    }

    async fn simulate_operations(
        &self,
        request: &dyn TopologyChangeRequest,
    ) -> TopologyResult<TopologyChangeResult> {
        self.handle(request, true).await.inspect_err(|e| {
            warn!(error = %e, "Rejected simulated topology change request");
        })
    }

    async fn cancel_change(&self, change_id: ChangeId) -> TopologyResult<ClusterTopology> {
        let cancelled = self
            .manager
            .update_cluster_topology(Box::new(move |live: ClusterTopology| {
                if live.is_uninitialized() {
                    return Err(TopologyError::OperationNotAllowed(format!(
                        "Expected to cancel change {}, but the topology is not initialized yet",
                        change_id
                    )));
                }
                let pending_id = match live.pending_changes() {
                    Some(plan) if live.has_pending_changes() => plan.id,
                    _ => {
                        return Err(TopologyError::invalid(format!(
                            "Expected to cancel change {}, but no change is in progress",
                            change_id
                        )));
                    }
                };
                if pending_id != change_id {
                    return Err(TopologyError::invalid(format!(
                        "Expected to cancel change {}, but the change in progress is {}",
                        change_id, pending_id
                    )));
                }
                Ok(live.cancel_pending_changes())
            }))
            .await
            .inspect_err(|e| warn!(change_id, error = %e, "Failed to cancel topology change"))?;

        info!(change_id, "Cancelled topology change");
        Ok(cancelled)
    }
}
