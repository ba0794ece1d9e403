//! Cleanup of replicas stuck in `down`
//!
//! Typical after a node is gone for good: its replicas stay registered as
//! `down` forever. Deletes are sent with `onlyIfDown=true`, and only for
//! shards that are active and still have an active replica.

use crate::admin::AdminApi;
use crate::error::Result;
use crate::metadata::MetadataReader;
use crate::topology::{ReplicaState, Shard};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ShardNotActive,
    NoActiveReplica,
}

/// One down replica and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownReplica {
    pub collection: String,
    pub shard: String,
    pub replica: String,
    pub node: String,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedShard {
    pub collection: String,
    pub shard: String,
    pub reason: SkipReason,
    /// Down replicas left in place
    pub down_replicas: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub replicas: Vec<DownReplica>,
    pub skipped: Vec<SkippedShard>,
}

impl CleanupReport {
    pub fn failed(&self) -> usize {
        self.replicas.iter().filter(|r| r.error.is_some()).count()
    }
}

pub struct DownReplicaCleaner {
    admin: Arc<dyn AdminApi>,
    metadata: Arc<dyn MetadataReader>,
}

impl DownReplicaCleaner {
    pub fn new(admin: Arc<dyn AdminApi>, metadata: Arc<dyn MetadataReader>) -> Self {
        Self { admin, metadata }
    }

    /// Delete down replicas in `only`, or in every collection when `None`
    pub async fn run(&self, only: Option<&str>, dry_run: bool) -> Result<CleanupReport> {
        let names: Vec<String> = match only {
            Some(name) => vec![name.to_string()],
            None => self.metadata.list_collections().await?.into_iter().collect(),
        };

        let mut report = CleanupReport {
            dry_run,
            ..Default::default()
        };

        for name in names {
            let collection = self.metadata.get_collection_state(&name).await?;
            for shard in collection.shards.values() {
                let down = down_replicas(shard);
                if down.is_empty() {
                    continue;
                }

                if let Some(reason) = skip_reason(shard) {
                    warn!(
                        collection = %name,
                        shard = %shard.name,
                        reason = ?reason,
                        "Leaving down replicas"
                    );
                    report.skipped.push(SkippedShard {
                        collection: name.clone(),
                        shard: shard.name.clone(),
                        reason,
                        down_replicas: down.iter().map(|(id, _)| id.to_string()).collect(),
                    });
                    continue;
                }

                for (id, node) in down {
                    let mut entry = DownReplica {
                        collection: name.clone(),
                        shard: shard.name.clone(),
                        replica: id.to_string(),
                        node: node.to_string(),
                        deleted: false,
                        error: None,
                    };

                    if dry_run {
                        info!(
                            collection = %name,
                            shard = %shard.name,
                            replica = id,
                            "Dry run: would delete down replica"
                        );
                    } else {
                        match self
                            .admin
                            .delete_replica(&name, &shard.name, id, true, None)
                            .await
                        {
                            Ok(response) if response.is_success() => {
                                info!(
                                    collection = %name,
                                    shard = %shard.name,
                                    replica = id,
                                    "Deleted down replica"
                                );
                                entry.deleted = true;
                            }
                            Ok(response) => entry.error = Some(response.error_message()),
                            Err(e) => entry.error = Some(e.to_string()),
                        }
                    }
                    report.replicas.push(entry);
                }
            }
        }

        Ok(report)
    }
}

/// (replica id, node) of every down replica in `shard`
fn down_replicas(shard: &Shard) -> Vec<(&str, &str)> {
    shard
        .replicas
        .values()
        .filter(|r| r.state == ReplicaState::Down)
        .map(|r| (r.id.as_str(), r.node_name.as_str()))
        .collect()
}

fn skip_reason(shard: &Shard) -> Option<SkipReason> {
    if !shard.state.is_active() {
        Some(SkipReason::ShardNotActive)
    } else if shard.active_replica_count() == 0 {
        Some(SkipReason::NoActiveReplica)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::fixtures::{replica, shard};
    use crate::topology::ShardState;

    #[test]
    fn test_skip_rules() {
        let healthy = shard(
            "shard1",
            vec![
                replica("core_node1", "a:8983_solr", ReplicaState::Active),
                replica("core_node2", "gone:8983_solr", ReplicaState::Down),
            ],
        );
        assert_eq!(skip_reason(&healthy), None);
        assert_eq!(down_replicas(&healthy), vec![("core_node2", "gone:8983_solr")]);

        let all_down = shard(
            "shard1",
            vec![replica("core_node2", "gone:8983_solr", ReplicaState::Down)],
        );
        assert_eq!(skip_reason(&all_down), Some(SkipReason::NoActiveReplica));

        let mut inactive = healthy.clone();
        inactive.state = ShardState::Inactive;
        assert_eq!(skip_reason(&inactive), Some(SkipReason::ShardNotActive));
    }
}
