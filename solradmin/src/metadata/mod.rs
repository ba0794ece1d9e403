//! Cluster metadata readers
//!
//! Produce topology views from the coordination service tree.
//!
//! # Backends
//!
//! - **ZkTree**: browses the coordination tree through a node's
//!   `/admin/zookeeper` endpoint over HTTP
//! - **Snapshot**: serves a previously captured
//!   [`ClusterSnapshot`](crate::topology::ClusterSnapshot) file
//!
//! Readers never retry. A failed read aborts the calling operation.

mod snapshot;
mod zk_tree;

pub use snapshot::SnapshotReader;
pub use zk_tree::ZkTreeReader;

use crate::error::ClusterError;
use crate::topology::Collection;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Source of collection topology and live node membership
#[async_trait]
pub trait MetadataReader: Send + Sync {
    /// Names of all known collections
    async fn list_collections(&self) -> Result<BTreeSet<String>, ClusterError>;

    /// Shard/replica tree of one collection
    async fn get_collection_state(&self, collection: &str) -> Result<Collection, ClusterError>;

    /// Nodes currently registered as live
    async fn list_live_nodes(&self) -> Result<BTreeSet<String>, ClusterError>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}
