//! Cluster topology model
//!
//! A point-in-time view of collections, shards and replicas as published by
//! the coordination service. Views are fetched per operation and never cached.

mod snapshot;
mod state_json;

pub use snapshot::ClusterSnapshot;
pub use state_json::parse_collection_state;

use crate::error::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Lifecycle state of a shard
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShardState {
    Active,
    Inactive,
    Construction,
    Recovery,
    Other(String),
}

impl ShardState {
    pub fn as_str(&self) -> &str {
        match self {
            ShardState::Active => "active",
            ShardState::Inactive => "inactive",
            ShardState::Construction => "construction",
            ShardState::Recovery => "recovery",
            ShardState::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ShardState::Active)
    }
}

impl From<String> for ShardState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => ShardState::Active,
            "inactive" => ShardState::Inactive,
            "construction" => ShardState::Construction,
            "recovery" => ShardState::Recovery,
            _ => ShardState::Other(s),
        }
    }
}

impl From<ShardState> for String {
    fn from(state: ShardState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for ShardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health state of a single replica
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReplicaState {
    Active,
    Down,
    Recovering,
    RecoveryFailed,
    Other(String),
}

impl ReplicaState {
    pub fn as_str(&self) -> &str {
        match self {
            ReplicaState::Active => "active",
            ReplicaState::Down => "down",
            ReplicaState::Recovering => "recovering",
            ReplicaState::RecoveryFailed => "recovery_failed",
            ReplicaState::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ReplicaState::Active)
    }
}

impl From<String> for ReplicaState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => ReplicaState::Active,
            "down" => ReplicaState::Down,
            "recovering" => ReplicaState::Recovering,
            "recovery_failed" => ReplicaState::RecoveryFailed,
            _ => ReplicaState::Other(s),
        }
    }
}

impl From<ReplicaState> for String {
    fn from(state: ReplicaState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One copy of a shard hosted on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    /// Replica identifier within the shard (e.g. `core_node3`)
    pub id: String,
    /// Hosting node (`host:port_context`)
    pub node_name: String,
    /// Core name on the hosting node
    pub core: String,
    pub state: ReplicaState,
    pub base_url: String,
    #[serde(default)]
    pub leader: bool,
}

/// A shard and its replica set, keyed by replica id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub name: String,
    pub state: ShardState,
    /// Hash range covered by the shard, when the router publishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default)]
    pub replicas: BTreeMap<String, Replica>,
}

impl Shard {
    /// The replica hosted on `node`, if any
    pub fn replica_on_node(&self, node: &str) -> Option<&Replica> {
        self.replicas.values().find(|r| r.node_name == node)
    }

    /// Every replica of this shard on `node`, in id order
    pub fn replicas_on_node<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Replica> {
        self.replicas.values().filter(move |r| r.node_name == node)
    }

    /// Whether any replica of this shard lives on `node`
    pub fn has_replica_on(&self, node: &str) -> bool {
        self.replica_on_node(node).is_some()
    }

    pub fn active_replica_count(&self) -> usize {
        self.replicas.values().filter(|r| r.state.is_active()).count()
    }
}

/// A collection's shard tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    #[serde(default)]
    pub shards: BTreeMap<String, Shard>,
}

impl Collection {
    pub fn shard(&self, name: &str) -> Option<&Shard> {
        self.shards.get(name)
    }

    /// All replicas paired with their shard
    pub fn replicas(&self) -> impl Iterator<Item = (&Shard, &Replica)> {
        self.shards
            .values()
            .flat_map(|shard| shard.replicas.values().map(move |r| (shard, r)))
    }

    /// Whether any shard of this collection has a replica on `node`
    pub fn has_replica_on(&self, node: &str) -> bool {
        self.shards.values().any(|s| s.has_replica_on(node))
    }

    /// Every node hosting at least one replica
    pub fn nodes(&self) -> BTreeSet<String> {
        self.replicas().map(|(_, r)| r.node_name.clone()).collect()
    }
}

/// Collection, shard and replica parsed from a core name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreName {
    pub collection: String,
    pub shard: String,
    pub replica: String,
}

/// Split a core name of the form `<collection>_<shard>_<replica>`.
///
/// The collection part may contain underscores; shard and replica may not.
pub fn parse_core_name(core: &str) -> Option<CoreName> {
    let mut parts = core.rsplitn(3, '_');
    let replica = parts.next()?;
    let shard = parts.next()?;
    let collection = parts.next()?;
    if collection.is_empty() || shard.is_empty() || replica.is_empty() {
        return None;
    }
    Some(CoreName {
        collection: collection.to_string(),
        shard: shard.to_string(),
        replica: replica.to_string(),
    })
}

/// Base URL for a node name such as `10.0.0.1:8983_solr`
pub fn node_base_url(node_name: &str) -> Result<String> {
    let (host_port, context) = node_name
        .split_once('_')
        .ok_or_else(|| ClusterError::InvalidNodeName(node_name.to_string()))?;
    if host_port.is_empty() || !host_port.contains(':') {
        return Err(ClusterError::InvalidNodeName(node_name.to_string()));
    }
    let context = context.replace('_', "/");
    if context.is_empty() {
        Ok(format!("http://{}", host_port))
    } else {
        Ok(format!("http://{}/{}", host_port, context))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_parse_core_name_with_underscored_collection() {
        let parsed = parse_core_name("logs_2024_01_shard2_replica5").unwrap();
        assert_eq!(parsed.collection, "logs_2024_01");
        assert_eq!(parsed.shard, "shard2");
        assert_eq!(parsed.replica, "replica5");

        let parsed = parse_core_name("products_shard1_replica1").unwrap();
        assert_eq!(parsed.collection, "products");
        assert_eq!(parsed.shard, "shard1");
        assert_eq!(parsed.replica, "replica1");

        assert!(parse_core_name("nounderscore").is_none());
        assert!(parse_core_name("_shard1_replica1").is_none());
    }

    #[test]
    fn test_node_base_url() {
        assert_eq!(
            node_base_url("10.20.30.40:8983_solr").unwrap(),
            "http://10.20.30.40:8983/solr"
        );
        assert_eq!(
            node_base_url("solr-1:8983_api_solr").unwrap(),
            "http://solr-1:8983/api/solr"
        );
        assert_eq!(node_base_url("solr-1:8983_").unwrap(), "http://solr-1:8983");
        assert!(node_base_url("solr-1").is_err());
        assert!(node_base_url("solr-1_solr").is_err());
    }

    #[test]
    fn test_state_strings_roundtrip_through_serde() {
        let state: ReplicaState = serde_json::from_str("\"recovery_failed\"").unwrap();
        assert_eq!(state, ReplicaState::RecoveryFailed);
        let state: ReplicaState = serde_json::from_str("\"weird\"").unwrap();
        assert_eq!(state, ReplicaState::Other("weird".into()));
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"weird\"");
    }

    #[test]
    fn test_shard_queries() {
        let shard = shard(
            "shard1",
            vec![
                replica("core_node1", "a:8983_solr", ReplicaState::Active),
                replica("core_node2", "b:8983_solr", ReplicaState::Down),
            ],
        );
        assert_eq!(shard.replica_on_node("b:8983_solr").unwrap().id, "core_node2");
        assert!(!shard.has_replica_on("c:8983_solr"));
        assert_eq!(shard.active_replica_count(), 1);
    }
}
