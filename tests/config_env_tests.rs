//! Integration tests for TopologyConfig::from_env()
//!
//! Environment variables are process-global, so every test here runs
//! serially and restores the variables it touched.

use cluster_topology::cluster::{TopologyConfig, TopologyError, TopologyProfile};
use cluster_topology::types::{MemberId, PartitionId};
use serial_test::serial;
use std::env;

/// All environment variables read by TopologyConfig::from_env().
const ALL_CONFIG_ENV_VARS: &[&str] = &[
    "TOPOLOGY_PROFILE",
    "MEMBER_ID",
    "CLUSTER_SIZE",
    "PARTITION_COUNT",
    "REPLICATION_FACTOR",
    "OPERATION_RETRY_MAX_TIMES",
];

/// Run `f` with exactly `vars` set among the config variables.
fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let all_originals: Vec<_> = ALL_CONFIG_ENV_VARS
        .iter()
        .map(|k| (*k, env::var(*k).ok()))
        .collect();

    for key in ALL_CONFIG_ENV_VARS {
        unsafe { env::remove_var(key) };
    }
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    for (key, original) in all_originals {
        match original {
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
    }

    result
}

#[test]
#[serial]
fn test_from_env_defaults_to_production_profile() {
    with_env_vars(&[], || {
        let config = TopologyConfig::from_env().expect("Should parse config");
        assert_eq!(config, TopologyConfig::from_profile(TopologyProfile::Production));
    });
}

#[test]
#[serial]
fn test_from_env_with_development_profile() {
    with_env_vars(&[("TOPOLOGY_PROFILE", "dev")], || {
        let config = TopologyConfig::from_env().expect("Should parse config");
        assert_eq!(config.cluster_size, 1);
        assert_eq!(config.replication_factor, 1);
    });
}

#[test]
#[serial]
fn test_from_env_overrides_profile_values() {
    with_env_vars(
        &[
            ("TOPOLOGY_PROFILE", "development"),
            ("MEMBER_ID", "broker-7"),
            ("CLUSTER_SIZE", "5"),
            ("PARTITION_COUNT", "8"),
            ("REPLICATION_FACTOR", "3"),
            ("OPERATION_RETRY_MAX_TIMES", "9"),
        ],
        || {
            let config = TopologyConfig::from_env().expect("Should parse config");
            assert_eq!(config.local_member_id, MemberId::new("broker-7"));
            assert_eq!(config.cluster_size, 5);
            assert_eq!(config.partition_count, 8);
            assert_eq!(config.replication_factor, 3);
            assert_eq!(config.operation_retry_max_times, 9);
            assert!(config.validate().is_ok());
        },
    );
}

#[test]
#[serial]
fn test_from_env_rejects_unknown_profile() {
    with_env_vars(&[("TOPOLOGY_PROFILE", "staging")], || {
        let err = TopologyConfig::from_env().unwrap_err();
        assert!(matches!(err, TopologyError::Config(_)));
        assert!(err.to_string().contains("staging"));
    });
}

#[test]
#[serial]
fn test_from_env_rejects_malformed_number() {
    with_env_vars(&[("PARTITION_COUNT", "many")], || {
        let err = TopologyConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PARTITION_COUNT"));
    });
}

#[test]
#[serial]
fn test_initial_topology_from_env() {
    with_env_vars(
        &[
            ("CLUSTER_SIZE", "4"),
            ("PARTITION_COUNT", "4"),
            ("REPLICATION_FACTOR", "2"),
        ],
        || {
            let topology = TopologyConfig::from_env()
                .and_then(|config| config.initial_topology())
                .expect("Should build topology");

            assert_eq!(topology.members().len(), 4);
            assert_eq!(topology.partition_count(), 4);
            assert_eq!(topology.min_replication_factor(), 2);
            assert!(!topology.has_pending_changes());
            for partition in 1..=4 {
                assert_eq!(
                    topology.members_with_partition(PartitionId::new(partition)).len(),
                    2
                );
            }
        },
    );
}

#[test]
#[serial]
fn test_initial_topology_rejects_replication_above_cluster_size() {
    with_env_vars(&[("CLUSTER_SIZE", "2"), ("REPLICATION_FACTOR", "3")], || {
        let result = TopologyConfig::from_env().and_then(|config| config.initial_topology());
        assert!(matches!(result, Err(TopologyError::Config(_))));
    });
}
