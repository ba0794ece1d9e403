//! Point-in-time topology snapshots
//!
//! A snapshot holds every collection's shard tree plus the live node set, so
//! reports can run offline against a file instead of the live cluster.

use super::Collection;
use crate::error::{ClusterError, Result};
use crate::metadata::MetadataReader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub live_nodes: BTreeSet<String>,
    #[serde(default)]
    pub collections: BTreeMap<String, Collection>,
}

impl ClusterSnapshot {
    pub fn new(live_nodes: BTreeSet<String>, collections: BTreeMap<String, Collection>) -> Self {
        Self {
            taken_at: Utc::now(),
            live_nodes,
            collections,
        }
    }

    /// Read the whole topology through `reader`
    pub async fn capture(reader: &dyn MetadataReader) -> Result<Self> {
        let live_nodes = reader.list_live_nodes().await?;
        let names = reader.list_collections().await?;
        info!(collections = names.len(), live_nodes = live_nodes.len(), "Capturing topology");

        let mut collections = BTreeMap::new();
        for name in names {
            debug!(collection = %name, "Reading collection state");
            let collection = reader.get_collection_state(&name).await?;
            collections.insert(name, collection);
        }

        Ok(Self::new(live_nodes, collections))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read(path)?;
        let snapshot: ClusterSnapshot = serde_json::from_slice(&content).map_err(|e| {
            ClusterError::MalformedTopology(format!("snapshot {}: {}", path.display(), e))
        })?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Map keys must agree with the names stored inside the entries
    fn validate(&self) -> Result<()> {
        for (name, collection) in &self.collections {
            if name != &collection.name {
                return Err(ClusterError::MalformedTopology(format!(
                    "snapshot entry '{}' holds collection '{}'",
                    name, collection.name
                )));
            }
            for (shard_name, shard) in &collection.shards {
                if shard_name != &shard.name {
                    return Err(ClusterError::MalformedTopology(format!(
                        "collection '{}': entry '{}' holds shard '{}'",
                        name, shard_name, shard.name
                    )));
                }
                for (id, replica) in &shard.replicas {
                    if id != &replica.id {
                        return Err(ClusterError::MalformedTopology(format!(
                            "collection '{}' shard '{}': entry '{}' holds replica '{}'",
                            name, shard_name, id, replica.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
