//! Topology scans

use super::{
    CollectionShardCount, CountFilter, NodeCoreCount, NodeReplicaCount, NodeScope,
    ShardReplicaCount, Unhealthy,
};
use crate::admin::AdminApi;
use crate::error::Result;
use crate::metadata::MetadataReader;
use crate::progress::ScanProgress;
use crate::topology::Collection;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs reports over a [`MetadataReader`]
pub struct FleetScanner {
    metadata: Arc<dyn MetadataReader>,
    show_progress: bool,
}

impl FleetScanner {
    pub fn new(metadata: Arc<dyn MetadataReader>) -> Self {
        Self {
            metadata,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while reading collections
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// `only` restricts the scan to one collection
    async fn collections(&self, only: Option<&str>) -> Result<Vec<Collection>> {
        let names: Vec<String> = match only {
            Some(name) => vec![name.to_string()],
            None => self.metadata.list_collections().await?.into_iter().collect(),
        };

        let progress = ScanProgress::new(names.len() as u64, "collections", self.show_progress);
        let mut collections = Vec::with_capacity(names.len());
        for name in &names {
            progress.set_message(name.clone());
            collections.push(self.metadata.get_collection_state(name).await?);
            progress.inc();
        }
        progress.finish();

        debug!(
            collections = collections.len(),
            backend = self.metadata.backend_name(),
            "Scanned topology"
        );
        Ok(collections)
    }

    /// Replicas hosted per node; live nodes without replicas report zero
    pub async fn node_replica_counts(&self) -> Result<Vec<NodeReplicaCount>> {
        let live = self.metadata.list_live_nodes().await?;
        let mut counts: BTreeMap<String, usize> = live.iter().map(|n| (n.clone(), 0)).collect();

        for collection in self.collections(None).await? {
            for (_, replica) in collection.replicas() {
                *counts.entry(replica.node_name.clone()).or_insert(0) += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(node, replicas)| NodeReplicaCount {
                live: live.contains(&node),
                node,
                replicas,
            })
            .collect())
    }

    pub async fn shard_replica_counts(
        &self,
        only: Option<&str>,
        filter: CountFilter,
    ) -> Result<Vec<ShardReplicaCount>> {
        let mut rows = Vec::new();
        for collection in self.collections(only).await? {
            for shard in collection.shards.values() {
                if filter.matches(shard.replicas.len()) {
                    rows.push(ShardReplicaCount {
                        collection: collection.name.clone(),
                        shard: shard.name.clone(),
                        replicas: shard.replicas.len(),
                    });
                }
            }
        }
        Ok(rows)
    }

    pub async fn collection_shard_counts(
        &self,
        only: Option<&str>,
        filter: CountFilter,
    ) -> Result<Vec<CollectionShardCount>> {
        Ok(self
            .collections(only)
            .await?
            .into_iter()
            .filter(|c| filter.matches(c.shards.len()))
            .map(|c| CollectionShardCount {
                shards: c.shards.len(),
                collection: c.name,
            })
            .collect())
    }

    /// Shards and replicas whose state is not `active`
    pub async fn unhealthy(&self, only: Option<&str>) -> Result<Vec<Unhealthy>> {
        let mut rows = Vec::new();
        for collection in self.collections(only).await? {
            for shard in collection.shards.values() {
                if !shard.state.is_active() {
                    rows.push(Unhealthy::Shard {
                        collection: collection.name.clone(),
                        shard: shard.name.clone(),
                        state: shard.state.to_string(),
                    });
                }
                for replica in shard.replicas.values() {
                    if !replica.state.is_active() {
                        rows.push(Unhealthy::Replica {
                            collection: collection.name.clone(),
                            shard: shard.name.clone(),
                            replica: replica.id.clone(),
                            node: replica.node_name.clone(),
                            state: replica.state.to_string(),
                        });
                    }
                }
            }
        }
        Ok(rows)
    }

    /// Cores reported by each node's core `STATUS`.
    ///
    /// A node that cannot be queried gets an error entry instead of failing
    /// the whole report.
    pub async fn core_counts(
        &self,
        admin: &dyn AdminApi,
        scope: NodeScope,
    ) -> Result<Vec<NodeCoreCount>> {
        let nodes: BTreeSet<String> = match scope {
            NodeScope::Live => self.metadata.list_live_nodes().await?,
            NodeScope::All => {
                let mut nodes = BTreeSet::new();
                for collection in self.collections(None).await? {
                    nodes.extend(collection.nodes());
                }
                nodes
            }
        };

        let progress = ScanProgress::new(nodes.len() as u64, "nodes", self.show_progress);
        let mut rows = Vec::with_capacity(nodes.len());
        for node in nodes {
            progress.set_message(node.clone());
            let row = match admin.core_status(Some(&node), None).await {
                Ok(response) if response.is_success() => {
                    progress.inc();
                    NodeCoreCount {
                        cores: Some(core_count(&response.body)),
                        error: None,
                        node,
                    }
                }
                Ok(response) => {
                    progress.inc_failed();
                    NodeCoreCount {
                        cores: None,
                        error: Some(response.error_message()),
                        node,
                    }
                }
                Err(e) => {
                    warn!(node = %node, error = %e, "Core status failed");
                    progress.inc_failed();
                    NodeCoreCount {
                        cores: None,
                        error: Some(e.to_string()),
                        node,
                    }
                }
            };
            rows.push(row);
        }
        progress.finish();
        Ok(rows)
    }
}

/// Number of entries in a core STATUS `status` map
pub fn core_count(body: &Value) -> usize {
    body.get("status")
        .and_then(Value::as_object)
        .map(|status| status.len())
        .unwrap_or(0)
}
