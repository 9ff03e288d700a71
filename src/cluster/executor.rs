//! No-op executors used to simulate a change plan.
//!
//! Simulation runs every applier's `init` and `apply` against a copy of the
//! topology. The executors must succeed without touching anything so that
//! only the appliers' own validation decides whether a plan is valid.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::traits::{PartitionChangeExecutor, TopologyMembershipChangeExecutor};
use crate::types::{MemberId, PartitionId, Priority};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPartitionChangeExecutor;

#[async_trait]
impl PartitionChangeExecutor for NoopPartitionChangeExecutor {
    async fn join(
        &self,
        _partition_id: PartitionId,
        _members_with_priority: BTreeMap<MemberId, Priority>,
    ) -> Result<(), String> {
        Ok(())
    }

    async fn leave(&self, _partition_id: PartitionId) -> Result<(), String> {
        Ok(())
    }

    async fn reconfigure_priority(
        &self,
        _partition_id: PartitionId,
        _priority: Priority,
    ) -> Result<(), String> {
        Ok(())
    }

    async fn force_reconfigure(
        &self,
        _partition_id: PartitionId,
        _members: Vec<MemberId>,
    ) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMembershipChangeExecutor;

#[async_trait]
impl TopologyMembershipChangeExecutor for NoopMembershipChangeExecutor {
    async fn add_broker(&self, _member_id: &MemberId) -> Result<(), String> {
        Ok(())
    }

    async fn remove_broker(&self, _member_id: &MemberId) -> Result<(), String> {
        Ok(())
    }
}
