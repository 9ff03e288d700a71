//! Configuration for the topology engine.
//!
//! # Configuration Profiles
//!
//! ```rust,no_run
//! use cluster_topology::cluster::{TopologyConfig, TopologyProfile};
//!
//! // Development profile - single member, quick retries
//! let dev_config = TopologyConfig::from_profile(TopologyProfile::Development);
//!
//! // Production profile - three members, patient retries
//! let prod_config = TopologyConfig::from_profile(TopologyProfile::Production);
//! ```
//!
//! # Environment Variables
//!
//! - `TOPOLOGY_PROFILE`: base profile for [`TopologyConfig::from_env`]
//! - `MEMBER_ID`: id of the local member (default: `0`)
//! - `CLUSTER_SIZE`: number of members at bootstrap
//! - `PARTITION_COUNT`: number of partitions at bootstrap
//! - `REPLICATION_FACTOR`: replicas per partition at bootstrap
//! - `OPERATION_RETRY_MAX_TIMES`: retries of a failing operation

use std::collections::BTreeSet;
use std::time::Duration;

use super::distributor::{PartitionDistributor, RoundRobinPartitionDistributor};
use super::error::{TopologyError, TopologyResult};
use super::state::{ClusterTopology, MemberState, PartitionState};
use crate::constants::{
    DEFAULT_CLUSTER_SIZE, DEFAULT_OPERATION_RETRY_MAX_DELAY, DEFAULT_OPERATION_RETRY_MAX_TIMES,
    DEFAULT_OPERATION_RETRY_MIN_DELAY, DEFAULT_PARTITION_COUNT, DEFAULT_REPLICATION_FACTOR,
};
use crate::types::{MemberId, PartitionId};

/// Validated configuration profiles.
///
/// | Profile | Members | Partitions | Replication | Retries |
/// |---------|---------|------------|-------------|---------|
/// | Development | 1 | 1 | 1 | 3, up to 1s |
/// | Production | 3 | 3 | 3 | 5, up to 10s |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyProfile {
    /// Single member cluster for local development and testing.
    ///
    /// **Not suitable for production use.**
    Development,

    /// Three members, every partition replicated on all of them.
    Production,
}

impl TopologyProfile {
    pub fn description(&self) -> &'static str {
        match self {
            TopologyProfile::Development => "Single member for local development and testing",
            TopologyProfile::Production => "Replicated production cluster",
        }
    }

    pub fn all() -> &'static [TopologyProfile] {
        &[TopologyProfile::Development, TopologyProfile::Production]
    }
}

impl std::fmt::Display for TopologyProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyProfile::Development => write!(f, "development"),
            TopologyProfile::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for TopologyProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(TopologyProfile::Development),
            "production" | "prod" => Ok(TopologyProfile::Production),
            _ => Err(format!(
                "Unknown profile '{}'. Valid profiles: development, production",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Id of the member this process runs as.
    pub local_member_id: MemberId,

    /// Number of members in the bootstrap topology.
    pub cluster_size: u32,

    /// Number of partitions in the bootstrap topology.
    pub partition_count: u32,

    /// Replicas per partition in the bootstrap topology.
    pub replication_factor: u32,

    /// Initial delay before retrying a failed operation.
    pub operation_retry_min_delay: Duration,

    /// Upper bound for the delay between operation retries.
    pub operation_retry_max_delay: Duration,

    /// Retries before an operation failure is surfaced.
    pub operation_retry_max_times: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            local_member_id: MemberId::from(0),
            cluster_size: DEFAULT_CLUSTER_SIZE,
            partition_count: DEFAULT_PARTITION_COUNT,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            operation_retry_min_delay: DEFAULT_OPERATION_RETRY_MIN_DELAY,
            operation_retry_max_delay: DEFAULT_OPERATION_RETRY_MAX_DELAY,
            operation_retry_max_times: DEFAULT_OPERATION_RETRY_MAX_TIMES,
        }
    }
}

impl TopologyConfig {
    pub fn from_profile(profile: TopologyProfile) -> Self {
        match profile {
            TopologyProfile::Development => Self {
                cluster_size: 1,
                partition_count: 1,
                replication_factor: 1,
                operation_retry_min_delay: Duration::from_millis(10),
                operation_retry_max_delay: Duration::from_secs(1),
                operation_retry_max_times: 3,
                ..Self::default()
            },
            TopologyProfile::Production => Self::default(),
        }
    }

    pub fn with_local_member_id(mut self, member_id: impl Into<MemberId>) -> Self {
        self.local_member_id = member_id.into();
        self
    }

    pub fn with_cluster_size(mut self, cluster_size: u32) -> Self {
        self.cluster_size = cluster_size;
        self
    }

    pub fn with_partition_count(mut self, partition_count: u32) -> Self {
        self.partition_count = partition_count;
        self
    }

    pub fn with_replication_factor(mut self, replication_factor: u32) -> Self {
        self.replication_factor = replication_factor;
        self
    }

    pub fn with_operation_retry_max_times(mut self, max_times: usize) -> Self {
        self.operation_retry_max_times = max_times;
        self
    }

    pub fn with_operation_retry_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.operation_retry_min_delay = min_delay;
        self.operation_retry_max_delay = max_delay;
        self
    }

    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cluster_size == 0 {
            errors.push("cluster_size must be greater than 0".to_string());
        }

        if self.partition_count == 0 {
            errors.push("partition_count must be greater than 0".to_string());
        }

        if self.replication_factor == 0 {
            errors.push("replication_factor must be greater than 0".to_string());
        } else if self.replication_factor > self.cluster_size {
            errors.push(format!(
                "replication_factor ({}) must not exceed cluster_size ({})",
                self.replication_factor, self.cluster_size
            ));
        }

        if self.operation_retry_min_delay > self.operation_retry_max_delay {
            errors.push(format!(
                "operation_retry_min_delay ({:?}) must not exceed operation_retry_max_delay ({:?})",
                self.operation_retry_min_delay, self.operation_retry_max_delay
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset variables keep the value of the profile named by
    /// `TOPOLOGY_PROFILE` (default: production).
    pub fn from_env() -> TopologyResult<Self> {
        let profile = match std::env::var("TOPOLOGY_PROFILE") {
            Ok(name) => name.parse().map_err(TopologyError::Config)?,
            Err(_) => TopologyProfile::Production,
        };
        let defaults = Self::from_profile(profile);

        let local_member_id = std::env::var("MEMBER_ID")
            .map(MemberId::from)
            .unwrap_or(defaults.local_member_id);

        Ok(Self {
            local_member_id,
            cluster_size: parse_env("CLUSTER_SIZE", defaults.cluster_size)?,
            partition_count: parse_env("PARTITION_COUNT", defaults.partition_count)?,
            replication_factor: parse_env("REPLICATION_FACTOR", defaults.replication_factor)?,
            operation_retry_max_times: parse_env(
                "OPERATION_RETRY_MAX_TIMES",
                defaults.operation_retry_max_times,
            )?,
            ..defaults
        })
    }

    /// The topology a cluster bootstraps with.
    ///
    /// Members `0..cluster_size` are all `Active`; partitions `1..=partition_count`
    /// are placed by the round-robin distributor.
    pub fn initial_topology(&self) -> TopologyResult<ClusterTopology> {
        self.validate()
            .map_err(|errors| TopologyError::Config(errors.join("; ")))?;

        let members: BTreeSet<MemberId> = (0..self.cluster_size).map(MemberId::from).collect();
        let partitions: Vec<PartitionId> =
            (1..=self.partition_count).map(PartitionId::new).collect();
        let distribution = RoundRobinPartitionDistributor.distribute_partitions(
            &members,
            &partitions,
            self.replication_factor as usize,
        );

        let topology = members.iter().fold(ClusterTopology::init(), |topology, member_id| {
            let partitions = distribution
                .iter()
                .filter_map(|metadata| {
                    metadata
                        .priority_of(member_id)
                        .map(|priority| (metadata.partition_id, PartitionState::active(priority)))
                })
                .collect();
            topology.add_member(member_id.clone(), MemberState::active(partitions))
        });
        Ok(topology)
    }
}

fn parse_env<T>(key: &str, default: T) -> TopologyResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| TopologyError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TopologyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_profiles_are_valid() {
        for profile in TopologyProfile::all() {
            assert!(
                TopologyConfig::from_profile(*profile).validate().is_ok(),
                "profile {} should be valid",
                profile
            );
        }
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("dev".parse::<TopologyProfile>(), Ok(TopologyProfile::Development));
        assert_eq!("PRODUCTION".parse::<TopologyProfile>(), Ok(TopologyProfile::Production));
        assert!("staging".parse::<TopologyProfile>().is_err());
    }

    #[test]
    fn test_validate_replication_factor_above_cluster_size() {
        let errors = TopologyConfig::default()
            .with_cluster_size(2)
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("replication_factor (3)"));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let errors = TopologyConfig::default()
            .with_partition_count(0)
            .with_replication_factor(0)
            .with_operation_retry_delays(Duration::from_secs(5), Duration::from_secs(1))
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_initial_topology_distributes_partitions() {
        let topology = TopologyConfig::default()
            .with_cluster_size(3)
            .with_partition_count(3)
            .with_replication_factor(2)
            .initial_topology()
            .unwrap();

        assert_eq!(topology.version(), 0);
        assert_eq!(topology.members().len(), 3);
        assert_eq!(topology.partition_count(), 3);
        assert_eq!(topology.min_replication_factor(), 2);
        assert_eq!(
            topology.members_with_partition(PartitionId::new(1)),
            vec![&MemberId::from(0), &MemberId::from(1)]
        );
        let primary = topology.get_member(&MemberId::from(0)).unwrap();
        assert_eq!(primary.get_partition(PartitionId::new(1)), Some(&PartitionState::active(2)));
    }

    #[test]
    fn test_initial_topology_rejects_invalid_config() {
        let result = TopologyConfig::default().with_cluster_size(0).initial_topology();
        assert!(matches!(result, Err(TopologyError::Config(_))));
    }
}
