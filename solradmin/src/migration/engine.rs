//! Single replica move

use super::wait::await_completion;
use super::{MigrationError, MigrationPhase, MigrationReport, MoveRequest};
use crate::admin::AdminApi;
use crate::config::MigrationConfig;
use crate::metadata::MetadataReader;
use crate::metrics;
use crate::topology::{Collection, Replica, Shard};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives one replica move through its phases.
///
/// Clones share the admin client and metadata reader, so each batch worker
/// can own one.
#[derive(Clone)]
pub struct MigrationEngine {
    admin: Arc<dyn AdminApi>,
    metadata: Arc<dyn MetadataReader>,
    config: MigrationConfig,
}

impl MigrationEngine {
    pub fn new(
        admin: Arc<dyn AdminApi>,
        metadata: Arc<dyn MetadataReader>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            admin,
            metadata,
            config,
        }
    }

    pub fn admin(&self) -> &Arc<dyn AdminApi> {
        &self.admin
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataReader> {
        &self.metadata
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run `request` to completion or failure
    pub async fn move_replica(&self, request: &MoveRequest) -> MigrationReport {
        let start = Instant::now();
        let mut report = MigrationReport::new(request);

        info!(
            collection = %request.collection,
            shard = %request.shard,
            source = %request.source_node,
            destination = request.destination_node.as_deref().unwrap_or("<any>"),
            async_id = request.async_id.as_deref().unwrap_or("<sync>"),
            dry_run = request.dry_run,
            "Moving replica"
        );

        let outcome = self.drive(request, &mut report).await;
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                metrics::record_migration("success", report.phase().as_str(), start.elapsed());
            }
            Err(e) => {
                if e.replica_orphaned() {
                    error!(
                        collection = %request.collection,
                        shard = %request.shard,
                        replica = report.task.replica_id.as_deref().unwrap_or("?"),
                        destination = request.destination_node.as_deref().unwrap_or("<any>"),
                        error = %e,
                        "Move failed after the new replica was requested; the shard may now \
                         have an extra replica and the source was not removed. Operator \
                         intervention required"
                    );
                } else {
                    warn!(
                        collection = %request.collection,
                        shard = %request.shard,
                        phase = %e.phase(),
                        error = %e,
                        "Move failed"
                    );
                }
                metrics::record_migration("failed", e.phase().as_str(), start.elapsed());
                report.enter(MigrationPhase::Failed);
                report.error = Some(e);
            }
        }

        report
    }

    async fn drive(
        &self,
        request: &MoveRequest,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        report.enter(MigrationPhase::LocateSource);
        let collection = self
            .metadata
            .get_collection_state(&request.collection)
            .await?;
        let source = match request.replica_id.as_deref() {
            Some(id) => locate_replica(&collection, &request.shard, &request.source_node, id)?,
            None => locate_source(&collection, &request.shard, &request.source_node)?,
        };
        let replica_id = source.id.clone();
        report.task.replica_id = Some(replica_id.clone());

        if let (Some(destination), true) =
            (request.destination_node.as_deref(), request.validate_destination)
        {
            report.enter(MigrationPhase::ValidateDestination);
            validate_destination(&collection, &request.shard, destination)?;
        }

        if request.dry_run {
            info!(
                collection = %request.collection,
                shard = %request.shard,
                replica = %replica_id,
                destination = request.destination_node.as_deref().unwrap_or("<any>"),
                "Dry run: would add a replica then delete the source replica"
            );
            report.enter(MigrationPhase::Done);
            return Ok(());
        }

        report.enter(MigrationPhase::AddRequested);
        let add = self
            .admin
            .add_replica(
                &request.collection,
                &request.shard,
                request.destination_node.as_deref(),
                request.async_id.as_deref(),
            )
            .await
            .map_err(|e| MigrationError::AddFailed {
                collection: request.collection.clone(),
                shard: request.shard.clone(),
                reason: e.to_string(),
                delivery_uncertain: e.may_have_reached_server(),
            })?;
        if !add.is_success() {
            return Err(MigrationError::AddFailed {
                collection: request.collection.clone(),
                shard: request.shard.clone(),
                reason: add.error_message(),
                delivery_uncertain: false,
            });
        }
        debug!(collection = %request.collection, shard = %request.shard, "Add accepted");
        report.add_response = Some(add);

        if let Some(async_id) = request.async_id.as_deref() {
            report.enter(MigrationPhase::AwaitAsync);
            await_completion(
                self.admin.as_ref(),
                async_id,
                self.config.poll_interval(),
                self.config.max_missed_polls,
            )
            .await?;
        }

        report.enter(MigrationPhase::DeleteSource);
        let delete_failed = |reason: String| MigrationError::DeleteFailed {
            collection: request.collection.clone(),
            shard: request.shard.clone(),
            replica: replica_id.clone(),
            reason,
        };
        let delete = self
            .admin
            .delete_replica(&request.collection, &request.shard, &replica_id, false, None)
            .await
            .map_err(|e| delete_failed(e.to_string()))?;
        if !delete.is_success() {
            return Err(delete_failed(delete.error_message()));
        }

        info!(
            collection = %request.collection,
            shard = %request.shard,
            replica = %replica_id,
            "Source replica deleted"
        );
        report.delete_response = Some(delete);
        report.enter(MigrationPhase::Done);
        Ok(())
    }
}

fn find_shard<'a>(collection: &'a Collection, shard: &str) -> Result<&'a Shard, MigrationError> {
    collection
        .shard(shard)
        .ok_or_else(|| MigrationError::ShardNotFound {
            collection: collection.name.clone(),
            shard: shard.to_string(),
        })
}

/// The replica of `shard` hosted on `source_node`
pub fn locate_source<'a>(
    collection: &'a Collection,
    shard: &str,
    source_node: &str,
) -> Result<&'a Replica, MigrationError> {
    find_shard(collection, shard)?
        .replica_on_node(source_node)
        .ok_or_else(|| MigrationError::NoReplicaOnSource {
            collection: collection.name.clone(),
            shard: shard.to_string(),
            node: source_node.to_string(),
        })
}

/// The named replica, provided it still lives on `source_node`
pub fn locate_replica<'a>(
    collection: &'a Collection,
    shard: &str,
    source_node: &str,
    replica_id: &str,
) -> Result<&'a Replica, MigrationError> {
    find_shard(collection, shard)?
        .replicas
        .get(replica_id)
        .filter(|r| r.node_name == source_node)
        .ok_or_else(|| MigrationError::NoReplicaOnSource {
            collection: collection.name.clone(),
            shard: shard.to_string(),
            node: source_node.to_string(),
        })
}

/// Fails when `destination` already hosts a replica of `shard`
pub fn validate_destination(
    collection: &Collection,
    shard: &str,
    destination: &str,
) -> Result<(), MigrationError> {
    match find_shard(collection, shard)?.replica_on_node(destination) {
        Some(existing) => Err(MigrationError::DestinationOccupied {
            collection: collection.name.clone(),
            shard: shard.to_string(),
            node: destination.to_string(),
            replica: existing.id.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::fixtures::{replica, shard};
    use crate::topology::ReplicaState;

    fn collection() -> Collection {
        Collection {
            name: "c1".into(),
            shards: [(
                "shard1".to_string(),
                shard(
                    "shard1",
                    vec![
                        replica("r1", "a:8983_solr", ReplicaState::Active),
                        replica("r2", "b:8983_solr", ReplicaState::Active),
                    ],
                ),
            )]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn test_locate_source() {
        let c = collection();
        assert_eq!(locate_source(&c, "shard1", "a:8983_solr").unwrap().id, "r1");
        assert!(matches!(
            locate_source(&c, "shard1", "c:8983_solr"),
            Err(MigrationError::NoReplicaOnSource { .. })
        ));
        assert!(matches!(
            locate_source(&c, "shard9", "a:8983_solr"),
            Err(MigrationError::ShardNotFound { .. })
        ));
    }

    #[test]
    fn test_locate_named_replica() {
        let c = collection();
        assert_eq!(
            locate_replica(&c, "shard1", "b:8983_solr", "r2").unwrap().id,
            "r2"
        );
        assert!(matches!(
            locate_replica(&c, "shard1", "a:8983_solr", "r2"),
            Err(MigrationError::NoReplicaOnSource { .. })
        ));
        assert!(matches!(
            locate_replica(&c, "shard1", "a:8983_solr", "r7"),
            Err(MigrationError::NoReplicaOnSource { .. })
        ));
    }

    #[test]
    fn test_validate_destination() {
        let c = collection();
        assert!(validate_destination(&c, "shard1", "c:8983_solr").is_ok());
        match validate_destination(&c, "shard1", "b:8983_solr") {
            Err(MigrationError::DestinationOccupied { replica, .. }) => assert_eq!(replica, "r2"),
            other => panic!("expected DestinationOccupied, got {:?}", other),
        }
    }
}
