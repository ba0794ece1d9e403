//! Capturing a topology snapshot and running reports against it offline

mod common;

use common::*;
use solradmin::migration::{MigrationEngine, MigrationPhase, MoveRequest};
use solradmin::report::{FleetScanner, NodeScope};
use solradmin::{ClusterSnapshot, CountFilter, ReplicaState, SnapshotReader};
use std::sync::Arc;
use tempfile::tempdir;

fn fleet() -> Arc<FakeCluster> {
    let logs = collection(
        "logs",
        vec![
            shard(
                "shard1",
                vec![
                    replica("r1", NODE_A, ReplicaState::Active),
                    replica("r2", NODE_B, ReplicaState::Down),
                ],
            ),
            shard("shard2", vec![replica("r1", NODE_A, ReplicaState::Active)]),
        ],
    );
    Arc::new(FakeCluster::new(vec![two_replica_collection(), logs]))
}

#[tokio::test]
async fn test_snapshot_round_trips_through_file() {
    let fake = fleet();
    let dir = tempdir().unwrap();
    let path = dir.path().join("topology.json");

    let snapshot = ClusterSnapshot::capture(fake.as_ref()).await.unwrap();
    assert_eq!(snapshot.collections.len(), 2);
    assert_eq!(snapshot.live_nodes.len(), 2);
    snapshot.save(&path).unwrap();

    let reader = SnapshotReader::from_file(&path).unwrap();
    assert_eq!(reader.snapshot(), &snapshot);
}

#[tokio::test]
async fn test_reports_match_live_and_offline() {
    let fake = fleet();
    let dir = tempdir().unwrap();
    let path = dir.path().join("topology.json");
    ClusterSnapshot::capture(fake.as_ref())
        .await
        .unwrap()
        .save(&path)
        .unwrap();

    let live = FleetScanner::new(fake.clone());
    let offline = FleetScanner::new(Arc::new(SnapshotReader::from_file(&path).unwrap()));

    assert_eq!(
        live.node_replica_counts().await.unwrap(),
        offline.node_replica_counts().await.unwrap()
    );
    assert_eq!(
        live.unhealthy(None).await.unwrap(),
        offline.unhealthy(None).await.unwrap()
    );

    let single = offline
        .shard_replica_counts(None, CountFilter::new(Some(2), None))
        .await
        .unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!((single[0].collection.as_str(), single[0].shard.as_str()), ("logs", "shard2"));

    let wide = offline
        .collection_shard_counts(None, CountFilter::new(None, Some(1)))
        .await
        .unwrap();
    assert_eq!(wide.len(), 1);
    assert_eq!(wide[0].collection, "logs");
}

#[tokio::test]
async fn test_core_counts_per_node() {
    let fake = fleet();
    let scanner = FleetScanner::new(fake.clone());

    let rows = scanner.core_counts(fake.as_ref(), NodeScope::Live).await.unwrap();

    let counts: Vec<(&str, Option<usize>)> =
        rows.iter().map(|r| (r.node.as_str(), r.cores)).collect();
    assert_eq!(counts, vec![(NODE_A, Some(3)), (NODE_B, Some(2))]);
    assert!(rows.iter().all(|r| r.error.is_none()));
}

#[tokio::test]
async fn test_dry_run_move_against_snapshot() {
    let fake = fleet();
    let snapshot = ClusterSnapshot::capture(fake.as_ref()).await.unwrap();
    let engine = MigrationEngine::new(
        fake.clone(),
        Arc::new(SnapshotReader::new(snapshot)),
        fast_config(),
    );

    let request = MoveRequest::new("logs", "shard2", NODE_A)
        .with_destination(Some(NODE_B))
        .validate(true)
        .dry_run(true);
    let report = engine.move_replica(&request).await;

    assert!(report.is_success());
    assert_eq!(report.phase(), MigrationPhase::Done);
    assert!(fake.mutations().is_empty());
}
