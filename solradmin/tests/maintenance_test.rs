//! Down replica cleanup

mod common;

use common::*;
use solradmin::maintenance::{DownReplicaCleaner, SkipReason};
use solradmin::{ReplicaState, ShardState};
use std::sync::Arc;

fn cluster() -> Arc<FakeCluster> {
    let mut splitting = shard(
        "shard2",
        vec![
            replica("r1", NODE_A, ReplicaState::Active),
            replica("r2", NODE_C, ReplicaState::Down),
        ],
    );
    splitting.state = ShardState::Construction;

    let logs = collection(
        "logs",
        vec![
            shard(
                "shard1",
                vec![
                    replica("r1", NODE_A, ReplicaState::Active),
                    replica("r2", NODE_C, ReplicaState::Down),
                ],
            ),
            splitting,
            shard(
                "shard3",
                vec![
                    replica("r1", NODE_B, ReplicaState::Down),
                    replica("r2", NODE_C, ReplicaState::Down),
                ],
            ),
        ],
    );
    Arc::new(FakeCluster::new(vec![two_replica_collection(), logs]))
}

fn cleaner(fake: &Arc<FakeCluster>) -> DownReplicaCleaner {
    DownReplicaCleaner::new(fake.clone(), fake.clone())
}

#[tokio::test]
async fn test_deletes_only_from_healthy_shards() {
    let fake = cluster();

    let report = cleaner(&fake).run(None, false).await.unwrap();

    assert_eq!(report.replicas.len(), 1);
    assert!(report.replicas[0].deleted);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        fake.mutations(),
        vec![Call::Delete {
            collection: "logs".into(),
            shard: "shard1".into(),
            replica: "r2".into(),
            only_if_down: true,
        }]
    );

    let skipped: Vec<(&str, &SkipReason)> = report
        .skipped
        .iter()
        .map(|s| (s.shard.as_str(), &s.reason))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("shard2", &SkipReason::ShardNotActive),
            ("shard3", &SkipReason::NoActiveReplica),
        ]
    );
    assert_eq!(report.skipped[1].down_replicas, vec!["r1", "r2"]);
    assert!(!fake.placement("logs", "shard1").contains_key("r2"));
}

#[tokio::test]
async fn test_dry_run_lists_without_deleting() {
    let fake = cluster();

    let report = cleaner(&fake).run(Some("logs"), true).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.replicas.len(), 1);
    assert!(!report.replicas[0].deleted);
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_delete_is_recorded() {
    let fake = Arc::new(
        FakeCluster::new(vec![collection(
            "logs",
            vec![shard(
                "shard1",
                vec![
                    replica("r1", NODE_A, ReplicaState::Active),
                    replica("r2", NODE_C, ReplicaState::Down),
                ],
            )],
        )])
        .with_delete_status(1),
    );

    let report = cleaner(&fake).run(None, false).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert!(!report.replicas[0].deleted);
    assert!(fake.placement("logs", "shard1").contains_key("r2"));
}

#[tokio::test]
async fn test_unknown_collection_fails() {
    let fake = cluster();
    assert!(cleaner(&fake).run(Some("ghost"), false).await.is_err());
}
