//! Batch drivers: sequential node drain and the concurrent collection migrator

use super::{MigrationEngine, MigrationReport, MoveRequest};
use crate::error::{ClusterError, Result};
use crate::metadata::MetadataReader;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Options for [`BatchMigrator::drain_node`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainOptions {
    pub source_node: String,
    pub destination_node: Option<String>,
    /// Moves to attempt; 0 means until nothing eligible remains
    pub limit: usize,
    pub dry_run: bool,
    pub continue_on_error: bool,
}

impl DrainOptions {
    pub fn new(source_node: &str) -> Self {
        Self {
            source_node: source_node.to_string(),
            destination_node: None,
            limit: 0,
            dry_run: false,
            continue_on_error: false,
        }
    }
}

/// Next replica a drain will move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveCandidate {
    pub collection: String,
    pub shard: String,
    pub replica: String,
}

impl std::fmt::Display for MoveCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.collection, self.shard, self.replica)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    LimitReached,
    NoEligibleReplicas,
    /// A move failed and `continue_on_error` was off
    Failed,
    /// Topology could not be read while looking for the next replica
    MetadataUnavailable(String),
}

/// Result of a node drain
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub stop_reason: StopReason,
    /// Reports of the failed moves, in order
    pub failures: Vec<MigrationReport>,
}

impl BatchSummary {
    /// No move failed and the drain did not stop on a topology read error
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
            && !matches!(self.stop_reason, StopReason::MetadataUnavailable(_))
    }
}

/// Options for [`BatchMigrator::plan_collections`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPlanOptions {
    pub source_node: String,
    pub destination_node: Option<String>,
    /// Collections to migrate; 0 means all
    pub limit: usize,
}

/// All moves of one collection, each with its pre-assigned request id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionJob {
    pub collection: String,
    pub moves: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub collection: String,
    pub success: bool,
    pub reports: Vec<MigrationReport>,
}

/// Repeats [`MigrationEngine::move_replica`] across a node or collection set
pub struct BatchMigrator {
    engine: MigrationEngine,
}

impl BatchMigrator {
    pub fn new(engine: MigrationEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &MigrationEngine {
        &self.engine
    }

    /// Clear stored async statuses so reused request ids start clean
    async fn flush_statuses(&self) -> Result<()> {
        let response = self.engine.admin().flush_request_status().await?;
        if !response.is_success() {
            return Err(ClusterError::UnexpectedResponse(format!(
                "DELETESTATUS flush: {}",
                response.error_message()
            )));
        }
        debug!("Flushed stored request statuses");
        Ok(())
    }

    /// Move replicas off `options.source_node` one at a time.
    ///
    /// `on_move` is called with each candidate before its move starts. A
    /// topology read failure after the initial flush ends the drain with
    /// [`StopReason::MetadataUnavailable`] and the moves made so far.
    pub async fn drain_node<F>(
        &self,
        options: &DrainOptions,
        mut on_move: F,
    ) -> Result<BatchSummary>
    where
        F: FnMut(&MoveCandidate) + Send,
    {
        if !options.dry_run {
            self.flush_statuses().await?;
        }

        let mut request_id = self.engine.config().first_request_id;
        let mut visited: BTreeSet<(String, String, String)> = BTreeSet::new();
        let mut attempted = 0;
        let mut succeeded = 0;
        let mut failures = Vec::new();

        let stop_reason = loop {
            if options.limit > 0 && attempted >= options.limit {
                break StopReason::LimitReached;
            }

            let candidate = match next_candidate(
                self.engine.metadata().as_ref(),
                &options.source_node,
                options.destination_node.as_deref(),
                &visited,
            )
            .await
            {
                Ok(Some(candidate)) => candidate,
                Ok(None) => break StopReason::NoEligibleReplicas,
                Err(e) => {
                    error!(
                        source = %options.source_node,
                        attempted = attempted,
                        error = %e,
                        "Topology read failed, stopping drain"
                    );
                    break StopReason::MetadataUnavailable(e.to_string());
                }
            };

            on_move(&candidate);
            visited.insert((
                candidate.collection.clone(),
                candidate.shard.clone(),
                candidate.replica.clone(),
            ));

            let request = MoveRequest::new(
                &candidate.collection,
                &candidate.shard,
                &options.source_node,
            )
            .with_replica(Some(&candidate.replica))
            .with_destination(options.destination_node.as_deref())
            .with_async_id(Some(request_id.to_string()))
            .validate(true)
            .dry_run(options.dry_run);
            request_id += 1;
            attempted += 1;

            let report = self.engine.move_replica(&request).await;
            if report.is_success() {
                succeeded += 1;
            } else {
                failures.push(report);
                if !options.continue_on_error {
                    break StopReason::Failed;
                }
            }
        };

        info!(
            source = %options.source_node,
            attempted = attempted,
            succeeded = succeeded,
            failed = failures.len(),
            stop_reason = ?stop_reason,
            "Drain finished"
        );

        Ok(BatchSummary {
            attempted,
            succeeded,
            stop_reason,
            failures,
        })
    }

    /// Collections to migrate off the source node, with request ids assigned.
    ///
    /// Collections already holding a replica on the destination are left out.
    pub async fn plan_collections(
        &self,
        options: &CollectionPlanOptions,
    ) -> Result<Vec<CollectionJob>> {
        let metadata = self.engine.metadata();
        let mut request_id = self.engine.config().first_request_id;
        let mut jobs = Vec::new();

        for name in metadata.list_collections().await? {
            if options.limit > 0 && jobs.len() >= options.limit {
                break;
            }
            let collection = metadata.get_collection_state(&name).await?;
            if let Some(destination) = options.destination_node.as_deref() {
                if collection.has_replica_on(destination) {
                    debug!(collection = %name, destination = destination, "Already on destination");
                    continue;
                }
            }

            let shards: Vec<String> = collection
                .shards
                .values()
                .filter(|shard| shard.has_replica_on(&options.source_node))
                .map(|shard| shard.name.clone())
                .collect();
            if shards.is_empty() {
                continue;
            }

            let moves = shards
                .into_iter()
                .map(|shard| {
                    let id = request_id.to_string();
                    request_id += 1;
                    (shard, id)
                })
                .collect();
            jobs.push(CollectionJob {
                collection: name,
                moves,
            });
        }

        Ok(jobs)
    }

    /// Migrate whole collections with a bounded worker pool.
    ///
    /// Workers pull jobs from a shared queue; shards of one collection move
    /// sequentially and the collection stops at its first failure.
    pub async fn migrate_collections(
        &self,
        options: &CollectionPlanOptions,
        workers: usize,
        dry_run: bool,
    ) -> Result<Vec<CollectionOutcome>> {
        let jobs = self.plan_collections(options).await?;
        if jobs.is_empty() {
            info!(source = %options.source_node, "No collections to migrate");
            return Ok(Vec::new());
        }
        if !dry_run {
            self.flush_statuses().await?;
        }

        let workers = workers.max(1).min(jobs.len());
        info!(
            collections = jobs.len(),
            workers = workers,
            source = %options.source_node,
            "Starting collection migration"
        );

        let queue = Arc::new(Mutex::new(jobs.into_iter().collect::<VecDeque<_>>()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let engine = self.engine.clone();
            let source = options.source_node.clone();
            let destination = options.destination_node.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let job = queue.lock().pop_front();
                    let Some(job) = job else { break };
                    debug!(worker = worker_id, collection = %job.collection, "Picked up collection");
                    let outcome =
                        migrate_collection(&engine, job, &source, destination.as_deref(), dry_run)
                            .await;
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            info!(
                collection = %outcome.collection,
                success = outcome.success,
                moves = outcome.reports.len(),
                "Collection finished"
            );
            outcomes.push(outcome);
        }

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Migration worker panicked");
            }
        }

        Ok(outcomes)
    }
}

async fn migrate_collection(
    engine: &MigrationEngine,
    job: CollectionJob,
    source: &str,
    destination: Option<&str>,
    dry_run: bool,
) -> CollectionOutcome {
    let mut reports = Vec::with_capacity(job.moves.len());
    let mut success = true;

    for (shard, request_id) in &job.moves {
        let request = MoveRequest::new(&job.collection, shard, source)
            .with_destination(destination)
            .with_async_id(Some(request_id.clone()))
            .validate(destination.is_some())
            .dry_run(dry_run);
        let report = engine.move_replica(&request).await;
        let failed = !report.is_success();
        reports.push(report);
        if failed {
            warn!(collection = %job.collection, shard = %shard, "Stopping collection after failed move");
            success = false;
            break;
        }
    }

    CollectionOutcome {
        collection: job.collection,
        success,
        reports,
    }
}

/// First replica on `source` not yet attempted whose shard has no copy on `destination`.
///
/// A shard with several replicas on `source` yields each of them in turn.
async fn next_candidate(
    metadata: &dyn MetadataReader,
    source: &str,
    destination: Option<&str>,
    visited: &BTreeSet<(String, String, String)>,
) -> Result<Option<MoveCandidate>> {
    for name in metadata.list_collections().await? {
        let collection = metadata.get_collection_state(&name).await?;
        for shard in collection.shards.values() {
            if destination.is_some_and(|d| shard.has_replica_on(d)) {
                continue;
            }
            let fresh = shard.replicas_on_node(source).find(|r| {
                !visited.contains(&(name.clone(), shard.name.clone(), r.id.clone()))
            });
            if let Some(replica) = fresh {
                return Ok(Some(MoveCandidate {
                    collection: name.clone(),
                    shard: shard.name.clone(),
                    replica: replica.id.clone(),
                }));
            }
        }
    }
    Ok(None)
}
