//! Execution driver for committed change plans.
//!
//! Every member runs a driver. A driver only applies the head operation of
//! the pending plan when that operation names its own member; the other
//! members wait until gossip brings them a topology where they are next.
//!
//! # Applying One Operation
//!
//! ```text
//!   live topology ── head op for me? ── no ──▶ NotResponsible / Idle
//!         │
//!         ▼
//!   init(live)           validation against the live topology
//!   commit init          pre-mark (e.g. member Leaving)
//!   apply()              executor call, retried with backoff
//!   commit advance       post-mark + move op to completed
//! ```
//!
//! The committed topology is the only state. After a crash the driver
//! resumes at the head of `pending_operations`; completed operations are
//! never replayed. Re-running `init` for the head operation is safe because
//! every applier accepts its own pre-marked state.
//!
//! A failing operation leaves the plan pending. It is retried on the next
//! `try_advance` or removed by cancelling the change; it is never rolled
//! back.

use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::appliers::{OperationApplier, TopologyChangeAppliers};
use super::config::TopologyConfig;
use super::coordinator::coordinator_of;
use super::error::{TopologyError, TopologyResult};
use super::operations::TopologyChangeOperation;
use super::retry;
use super::state::ClusterTopology;
use super::traits::ClusterTopologyManager;
use crate::types::{ChangeId, MemberId};

/// Outcome of a single [`ChangeExecutionDriver::try_advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverStep {
    /// No change is in progress.
    Idle,
    /// The head operation belongs to another member.
    NotResponsible,
    /// The operation was applied and the plan advanced.
    Applied(TopologyChangeOperation),
    /// The head operation could not be applied; the plan stays pending.
    Failed(TopologyError),
}

pub struct ChangeExecutionDriver<M: ClusterTopologyManager> {
    local_member_id: MemberId,
    manager: Arc<M>,
    appliers: Arc<dyn TopologyChangeAppliers>,
    retry_policy: ExponentialBuilder,
}

impl<M: ClusterTopologyManager> ChangeExecutionDriver<M> {
    pub fn new(
        local_member_id: MemberId,
        manager: Arc<M>,
        appliers: Arc<dyn TopologyChangeAppliers>,
    ) -> Self {
        Self {
            local_member_id,
            manager,
            appliers,
            retry_policy: retry::operation_policy(),
        }
    }

    /// A driver for `config.local_member_id` that retries failing executor
    /// calls with the operation retry settings of `config`.
    pub fn from_config(
        config: &TopologyConfig,
        manager: Arc<M>,
        appliers: Arc<dyn TopologyChangeAppliers>,
    ) -> Self {
        Self::new(config.local_member_id.clone(), manager, appliers)
            .with_retry_policy(retry::operation_policy_from(config))
    }

    pub fn with_retry_policy(mut self, retry_policy: ExponentialBuilder) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Whether this member has to apply `operation`.
    ///
    /// Operations this member cannot interpret are claimed by the
    /// coordinator, whose applier then fails them.
    fn is_responsible(&self, topology: &ClusterTopology, operation: &TopologyChangeOperation) -> bool {
        match operation.member_id() {
            Some(member_id) => *member_id == self.local_member_id,
            None => coordinator_of(topology).as_ref() == Some(&self.local_member_id),
        }
    }

    /// Apply the head operation of the pending plan if it belongs to this member.
    pub async fn try_advance(&self) -> DriverStep {
        let topology = match self.manager.get_cluster_topology().await {
            Ok(topology) => topology,
            Err(e) => return DriverStep::Failed(e),
        };

        let Some(operation) = topology.next_pending_operation().cloned() else {
            return DriverStep::Idle;
        };
        if !self.is_responsible(&topology, &operation) {
            return DriverStep::NotResponsible;
        }
        let change_id = topology
            .pending_changes()
            .map(|plan| plan.id)
            .unwrap_or_default();

        match self.apply(topology, change_id, &operation).await {
            Ok(()) => {
                info!(change_id, operation = %operation, "Applied topology change operation");
                DriverStep::Applied(operation)
            }
            Err(e) => {
                error!(
                    change_id,
                    operation = %operation,
                    error = %e,
                    "Failed to apply topology change operation"
                );
                DriverStep::Failed(e)
            }
        }
    }

    /// Apply operations until the plan completes, another member is next,
    /// or an operation fails.
    pub async fn run_to_completion(&self) -> DriverStep {
        loop {
            match self.try_advance().await {
                DriverStep::Applied(_) => continue,
                other => return other,
            }
        }
    }

    async fn apply(
        &self,
        topology: ClusterTopology,
        change_id: ChangeId,
        operation: &TopologyChangeOperation,
    ) -> TopologyResult<()> {
        let mut applier = self.appliers.get_applier(operation);

        let init = applier.init(&topology)?;
        let expected = operation.clone();
        self.manager
            .update_cluster_topology(Box::new(move |live: ClusterTopology| {
                ensure_head(&live, change_id, &expected)?;
                Ok(init(live))
            }))
            .await?;

        let applier: &dyn OperationApplier = applier.as_ref();
        let apply = (move || applier.apply())
            .retry(self.retry_policy)
            .when(|e: &TopologyError| e.is_retriable())
            .notify(|e: &TopologyError, delay| {
                warn!(change_id, error = %e, ?delay, "Retrying topology change operation");
                retry::record_retry_attempt("operation", e, delay);
            })
            .await?;

        let expected = operation.clone();
        self.manager
            .update_cluster_topology(Box::new(move |live: ClusterTopology| {
                ensure_head(&live, change_id, &expected)?;
                live.advance_topology_change(apply)
            }))
            .await?;

        Ok(())
    }
}

/// Fail unless `operation` is still the head of change `change_id`.
fn ensure_head(
    topology: &ClusterTopology,
    change_id: ChangeId,
    operation: &TopologyChangeOperation,
) -> TopologyResult<()> {
    let current_id = topology.pending_changes().map(|plan| plan.id);
    if current_id != Some(change_id) || topology.next_pending_operation() != Some(operation) {
        return Err(TopologyError::ConcurrentModification(format!(
            "Expected operation {} to be next in change {}, but the plan changed",
            operation, change_id
        )));
    }
    Ok(())
}
