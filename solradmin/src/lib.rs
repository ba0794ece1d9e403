//! solradmin - administration toolkit for SolrCloud clusters
//!
//! Adds, deletes and moves shard replicas, drains nodes and reports on
//! cluster topology through the cluster's HTTP admin API.
//!
//! # Architecture
//!
//! - **Admin**: `/admin/collections` and `/admin/cores` client with bounded retry
//! - **Metadata**: topology readers over the coordination tree or a snapshot file
//! - **Topology**: typed collection/shard/replica model and `state.json` parser
//! - **Migration**: replica move state machine plus sequential and pooled batch drivers
//! - **Report**: read-only fleet aggregates
//! - **Maintenance**: removal of replicas stuck in `down`
//!
//! # Key Operations
//!
//! - Replica add/delete with optional async request tracking
//! - Move: locate source, validate destination, add, await, delete
//! - Node drain and concurrent collection migration
//! - Replica, shard and core counts; unhealthy shard listing
//! - Topology snapshot capture and offline reads

pub mod admin;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod metadata;
pub mod metrics;
pub mod migration;
pub mod progress;
pub mod report;
pub mod topology;

pub use admin::{
    AdminApi, AdminRequest, AdminResponse, AsyncRequestStatus, AsyncState, RetryPolicy,
    SolrAdminClient,
};
pub use config::{ClusterConfig, Config, LoggingConfig, MigrationConfig, RetryConfig};
pub use error::ClusterError;
pub use maintenance::{CleanupReport, DownReplicaCleaner};
pub use metadata::{MetadataReader, SnapshotReader, ZkTreeReader};
pub use migration::{
    BatchMigrator, BatchSummary, CollectionOutcome, CollectionPlanOptions, DrainOptions,
    MigrationEngine, MigrationError, MigrationPhase, MigrationReport, MoveRequest,
};
pub use report::{CountFilter, FleetScanner, NodeScope};
pub use topology::{
    parse_collection_state, ClusterSnapshot, Collection, Replica, ReplicaState, Shard, ShardState,
};
