//! Property tests for node/core name handling and move preconditions

mod common;

use common::*;
use proptest::prelude::*;
use solradmin::migration::{locate_source, validate_destination, MigrationError};
use solradmin::topology::{node_base_url, parse_core_name};
use solradmin::ReplicaState;

const NODES: [&str; 5] = [
    "n0:8983_solr",
    "n1:8983_solr",
    "n2:8983_solr",
    "n3:8983_solr",
    "n4:8983_solr",
];

fn arb_placement() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(0..NODES.len(), 0..=NODES.len())
        .prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_core_name_splits_off_last_two_tokens(
        collection in "[a-z][a-z0-9_]{0,20}",
        shard in "[a-z0-9]{1,10}",
        replica in "[a-z0-9]{1,10}",
    ) {
        let parsed = parse_core_name(&format!("{}_{}_{}", collection, shard, replica)).unwrap();
        prop_assert_eq!(parsed.collection, collection);
        prop_assert_eq!(parsed.shard, shard);
        prop_assert_eq!(parsed.replica, replica);
    }

    #[test]
    fn test_node_base_url(
        host in "[a-z][a-z0-9.-]{0,20}",
        port in 1u16..,
        context in "[a-z]{1,8}",
    ) {
        let url = node_base_url(&format!("{}:{}_{}", host, port, context)).unwrap();
        prop_assert_eq!(url, format!("http://{}:{}/{}", host, port, context));
    }

    #[test]
    fn test_move_preconditions_follow_placement(
        placement in arb_placement(),
        source in 0..NODES.len(),
        destination in 0..NODES.len(),
    ) {
        let replicas = placement
            .iter()
            .enumerate()
            .map(|(i, &n)| replica(&format!("core_node{}", i), NODES[n], ReplicaState::Active))
            .collect();
        let c = collection("c1", vec![shard("shard1", replicas)]);

        match locate_source(&c, "shard1", NODES[source]) {
            Ok(found) => {
                prop_assert!(placement.contains(&source));
                prop_assert_eq!(found.node_name.as_str(), NODES[source]);
            }
            Err(MigrationError::NoReplicaOnSource { .. }) => {
                prop_assert!(!placement.contains(&source));
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }

        match validate_destination(&c, "shard1", NODES[destination]) {
            Ok(()) => prop_assert!(!placement.contains(&destination)),
            Err(MigrationError::DestinationOccupied { node, .. }) => {
                prop_assert!(placement.contains(&destination));
                prop_assert_eq!(node.as_str(), NODES[destination]);
            }
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }

        let missing = locate_source(&c, "shard9", NODES[source]);
        let is_shard_not_found = matches!(missing, Err(MigrationError::ShardNotFound { .. }));
        prop_assert!(is_shard_not_found);
    }
}
