//! Metadata served from a topology snapshot file

use super::MetadataReader;
use crate::error::ClusterError;
use crate::topology::{ClusterSnapshot, Collection};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

/// Read-only reader over a [`ClusterSnapshot`]
pub struct SnapshotReader {
    snapshot: ClusterSnapshot,
}

impl SnapshotReader {
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_file(path: &Path) -> Result<Self, ClusterError> {
        Ok(Self::new(ClusterSnapshot::load(path)?))
    }

    pub fn snapshot(&self) -> &ClusterSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl MetadataReader for SnapshotReader {
    async fn list_collections(&self) -> Result<BTreeSet<String>, ClusterError> {
        Ok(self.snapshot.collections.keys().cloned().collect())
    }

    async fn get_collection_state(&self, collection: &str) -> Result<Collection, ClusterError> {
        self.snapshot
            .collections
            .get(collection)
            .cloned()
            .ok_or_else(|| ClusterError::CollectionNotFound(collection.to_string()))
    }

    async fn list_live_nodes(&self) -> Result<BTreeSet<String>, ClusterError> {
        Ok(self.snapshot.live_nodes.clone())
    }

    fn backend_name(&self) -> &'static str {
        "snapshot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_unknown_collection() {
        let reader = SnapshotReader::new(ClusterSnapshot::new(BTreeSet::new(), BTreeMap::new()));
        assert!(reader.list_collections().await.unwrap().is_empty());
        assert!(matches!(
            reader.get_collection_state("missing").await,
            Err(ClusterError::CollectionNotFound(_))
        ));
    }
}
