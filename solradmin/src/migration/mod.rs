//! Replica migration
//!
//! Moves one replica off a node by adding a copy elsewhere, waiting for the
//! add to finish and only then deleting the source. Batch drivers repeat
//! the move for a whole node or a set of collections.
//!
//! # Phases
//!
//! ```text
//! LocateSource -> (ValidateDestination) -> AddRequested -> (AwaitAsync) -> DeleteSource -> Done
//! ```
//!
//! Any phase may end in `Failed`. A failure after the add succeeded leaves
//! two replicas of the shard in place; nothing is rolled back.

mod batch;
mod engine;
mod wait;

pub use batch::{
    BatchMigrator, BatchSummary, CollectionJob, CollectionOutcome, CollectionPlanOptions,
    DrainOptions, MoveCandidate, StopReason,
};
pub use engine::{locate_replica, locate_source, validate_destination, MigrationEngine};
pub use wait::await_completion;

use crate::admin::AdminResponse;
use crate::error::ClusterError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Step of a single replica move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    /// Finding the replica on the source node
    LocateSource,
    /// Checking the destination holds no copy of the shard
    ValidateDestination,
    /// ADDREPLICA sent
    AddRequested,
    /// Polling the async add
    AwaitAsync,
    /// DELETEREPLICA sent for the source replica
    DeleteSource,
    Done,
    Failed,
}

impl MigrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationPhase::LocateSource => "locate_source",
            MigrationPhase::ValidateDestination => "validate_destination",
            MigrationPhase::AddRequested => "add_requested",
            MigrationPhase::AwaitAsync => "await_async",
            MigrationPhase::DeleteSource => "delete_source",
            MigrationPhase::Done => "done",
            MigrationPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to move and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub collection: String,
    pub shard: String,
    pub source_node: String,
    /// Replica to move; the first one on `source_node` when absent
    pub replica_id: Option<String>,
    /// Let the cluster choose when absent
    pub destination_node: Option<String>,
    /// Send the add asynchronously under this request id and wait for it
    pub async_id: Option<String>,
    pub validate_destination: bool,
    pub dry_run: bool,
}

impl MoveRequest {
    pub fn new(collection: &str, shard: &str, source_node: &str) -> Self {
        Self {
            collection: collection.to_string(),
            shard: shard.to_string(),
            source_node: source_node.to_string(),
            replica_id: None,
            destination_node: None,
            async_id: None,
            validate_destination: false,
            dry_run: false,
        }
    }

    pub fn with_replica(mut self, replica: Option<&str>) -> Self {
        self.replica_id = replica.map(str::to_string);
        self
    }

    pub fn with_destination(mut self, node: Option<&str>) -> Self {
        self.destination_node = node.map(str::to_string);
        self
    }

    pub fn with_async_id(mut self, id: Option<String>) -> Self {
        self.async_id = id;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate_destination = validate;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A move in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationTask {
    pub collection: String,
    pub shard: String,
    /// Replica to delete once the copy exists; known after LocateSource
    pub replica_id: Option<String>,
    pub source_node: String,
    pub destination_node: Option<String>,
    pub async_id: Option<String>,
    pub phase: MigrationPhase,
}

impl MigrationTask {
    pub fn new(request: &MoveRequest) -> Self {
        Self {
            collection: request.collection.clone(),
            shard: request.shard.clone(),
            replica_id: None,
            source_node: request.source_node.clone(),
            destination_node: request.destination_node.clone(),
            async_id: request.async_id.clone(),
            phase: MigrationPhase::LocateSource,
        }
    }
}

/// Outcome of one move, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub task: MigrationTask,
    /// Every phase entered, in order
    pub phases: Vec<MigrationPhase>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_response: Option<AdminResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_response: Option<AdminResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MigrationError>,
    pub elapsed_ms: u64,
}

impl MigrationReport {
    pub(crate) fn new(request: &MoveRequest) -> Self {
        Self {
            task: MigrationTask::new(request),
            phases: Vec::new(),
            dry_run: request.dry_run,
            add_response: None,
            delete_response: None,
            error: None,
            elapsed_ms: 0,
        }
    }

    pub(crate) fn enter(&mut self, phase: MigrationPhase) {
        self.task.phase = phase;
        self.phases.push(phase);
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn phase(&self) -> MigrationPhase {
        self.task.phase
    }
}

/// Why a move stopped
#[derive(Error, Debug, Clone)]
pub enum MigrationError {
    #[error("Collection '{collection}' has no shard '{shard}'")]
    ShardNotFound { collection: String, shard: String },

    #[error("No replica of {collection}/{shard} on source node {node}")]
    NoReplicaOnSource {
        collection: String,
        shard: String,
        node: String,
    },

    #[error("Replica {replica} of {collection}/{shard} already on destination node {node}")]
    DestinationOccupied {
        collection: String,
        shard: String,
        node: String,
        replica: String,
    },

    /// `delivery_uncertain` is set when the add timed out or its exchange
    /// broke, so the cluster may still create the replica
    #[error("Add replica failed for {collection}/{shard}: {reason}")]
    AddFailed {
        collection: String,
        shard: String,
        reason: String,
        delivery_uncertain: bool,
    },

    #[error("Async request {request_id} ended in state '{state}'{}", detail(.message))]
    AsyncTaskFailed {
        request_id: String,
        state: String,
        message: Option<String>,
    },

    #[error("Async request {request_id} not found after {polls} consecutive polls")]
    AsyncTaskMissing { request_id: String, polls: u32 },

    #[error("Status of async request {request_id} unavailable: {reason}")]
    AsyncStatusUnavailable { request_id: String, reason: String },

    #[error("Delete of replica {replica} from {collection}/{shard} failed: {reason}")]
    DeleteFailed {
        collection: String,
        shard: String,
        replica: String,
        reason: String,
    },

    #[error("Topology read failed: {0}")]
    Topology(#[from] ClusterError),
}

impl MigrationError {
    /// Phase that was running when the move failed
    pub fn phase(&self) -> MigrationPhase {
        match self {
            MigrationError::ShardNotFound { .. }
            | MigrationError::NoReplicaOnSource { .. }
            | MigrationError::Topology(_) => MigrationPhase::LocateSource,
            MigrationError::DestinationOccupied { .. } => MigrationPhase::ValidateDestination,
            MigrationError::AddFailed { .. } => MigrationPhase::AddRequested,
            MigrationError::AsyncTaskFailed { .. }
            | MigrationError::AsyncTaskMissing { .. }
            | MigrationError::AsyncStatusUnavailable { .. } => MigrationPhase::AwaitAsync,
            MigrationError::DeleteFailed { .. } => MigrationPhase::DeleteSource,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationError::ShardNotFound { .. } => "shard_not_found",
            MigrationError::NoReplicaOnSource { .. } => "no_replica_on_source",
            MigrationError::DestinationOccupied { .. } => "destination_occupied",
            MigrationError::AddFailed { .. } => "add_failed",
            MigrationError::AsyncTaskFailed { .. } => "async_task_failed",
            MigrationError::AsyncTaskMissing { .. } => "async_task_missing",
            MigrationError::AsyncStatusUnavailable { .. } => "async_status_unavailable",
            MigrationError::DeleteFailed { .. } => "delete_failed",
            MigrationError::Topology(_) => "topology",
        }
    }

    /// A destination replica may exist while the source was not removed
    pub fn replica_orphaned(&self) -> bool {
        matches!(
            self,
            MigrationError::AddFailed {
                delivery_uncertain: true,
                ..
            } | MigrationError::AsyncTaskMissing { .. }
                | MigrationError::AsyncStatusUnavailable { .. }
                | MigrationError::DeleteFailed { .. }
        )
    }
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl Serialize for MigrationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MigrationError", 4)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("phase", &self.phase())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("replica_orphaned", &self.replica_orphaned())?;
        state.end()
    }
}
