//! In-memory cluster double shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use solradmin::admin::{AdminApi, AdminResponse, AsyncRequestStatus, AsyncState};
use solradmin::error::{ClusterError, Result};
use solradmin::metadata::MetadataReader;
use solradmin::topology::{Collection, Replica, ReplicaState, Shard, ShardState};
use solradmin::MigrationConfig;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub const NODE_A: &str = "a:8983_solr";
pub const NODE_B: &str = "b:8983_solr";
pub const NODE_C: &str = "c:8983_solr";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add {
        collection: String,
        shard: String,
        node: Option<String>,
        async_id: Option<String>,
    },
    Delete {
        collection: String,
        shard: String,
        replica: String,
        only_if_down: bool,
    },
    Status(String),
    Flush,
    CoreStatus(Option<String>),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::Add { .. } | Call::Delete { .. })
    }
}

/// Admin API and metadata reader over one shared topology.
///
/// Accepted adds create a replica `r<n>` on the requested node and accepted
/// deletes remove the replica, so a test can inspect the end state.
pub struct FakeCluster {
    collections: Mutex<BTreeMap<String, Collection>>,
    live_nodes: BTreeSet<String>,
    calls: Mutex<Vec<Call>>,
    add_status: Mutex<i64>,
    delete_status: Mutex<i64>,
    statuses: Mutex<VecDeque<AsyncState>>,
    status_error: Mutex<Option<ClusterError>>,
    add_error: Mutex<Option<ClusterError>>,
    /// Successful `list_collections` reads left before they start failing
    list_budget: Mutex<Option<usize>>,
}

impl FakeCluster {
    pub fn new(collections: Vec<Collection>) -> Self {
        let live_nodes = collections
            .iter()
            .flat_map(|c| c.nodes())
            .collect::<BTreeSet<_>>();
        Self {
            collections: Mutex::new(
                collections
                    .into_iter()
                    .map(|c| (c.name.clone(), c))
                    .collect(),
            ),
            live_nodes,
            calls: Mutex::new(Vec::new()),
            add_status: Mutex::new(0),
            delete_status: Mutex::new(0),
            statuses: Mutex::new(VecDeque::new()),
            status_error: Mutex::new(None),
            add_error: Mutex::new(None),
            list_budget: Mutex::new(None),
        }
    }

    pub fn with_add_status(self, status: i64) -> Self {
        *self.add_status.lock() = status;
        self
    }

    pub fn with_delete_status(self, status: i64) -> Self {
        *self.delete_status.lock() = status;
        self
    }

    /// States returned by REQUESTSTATUS in order; `completed` once exhausted
    pub fn with_statuses(self, states: Vec<AsyncState>) -> Self {
        *self.statuses.lock() = states.into();
        self
    }

    /// Every REQUESTSTATUS fails with `error`
    pub fn with_status_error(self, error: ClusterError) -> Self {
        *self.status_error.lock() = Some(error);
        self
    }

    /// Every ADDREPLICA fails with `error` after being recorded
    pub fn with_add_error(self, error: ClusterError) -> Self {
        *self.add_error.lock() = Some(error);
        self
    }

    /// Metadata `list_collections` succeeds `reads` times, then fails
    pub fn with_failing_listing_after(self, reads: usize) -> Self {
        *self.list_budget.lock() = Some(reads);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn status_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Status(_)))
            .count()
    }

    pub fn collection(&self, name: &str) -> Collection {
        self.collections.lock()[name].clone()
    }

    /// Replica id -> node for one shard
    pub fn placement(&self, collection: &str, shard: &str) -> BTreeMap<String, String> {
        self.collection(collection).shards[shard]
            .replicas
            .values()
            .map(|r| (r.id.clone(), r.node_name.clone()))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

fn header(status: i64) -> AdminResponse {
    AdminResponse::ok(json!({"responseHeader": {"status": status, "QTime": 1}}))
}

#[async_trait]
impl AdminApi for FakeCluster {
    async fn add_replica(
        &self,
        collection: &str,
        shard: &str,
        node: Option<&str>,
        async_id: Option<&str>,
    ) -> Result<AdminResponse> {
        self.record(Call::Add {
            collection: collection.to_string(),
            shard: shard.to_string(),
            node: node.map(str::to_string),
            async_id: async_id.map(str::to_string),
        });
        if let Some(error) = self.add_error.lock().clone() {
            return Err(error);
        }

        let status = *self.add_status.lock();
        if status == 0 {
            let mut collections = self.collections.lock();
            let shard = collections
                .get_mut(collection)
                .and_then(|c| c.shards.get_mut(shard))
                .ok_or_else(|| ClusterError::CollectionNotFound(collection.to_string()))?;
            let id = (1..)
                .map(|n| format!("r{}", n))
                .find(|id| !shard.replicas.contains_key(id))
                .unwrap_or_default();
            let node = node.unwrap_or("auto:8983_solr");
            shard
                .replicas
                .insert(id.clone(), replica(&id, node, ReplicaState::Active));
        }
        Ok(header(status))
    }

    async fn delete_replica(
        &self,
        collection: &str,
        shard: &str,
        replica: &str,
        only_if_down: bool,
        _async_id: Option<&str>,
    ) -> Result<AdminResponse> {
        self.record(Call::Delete {
            collection: collection.to_string(),
            shard: shard.to_string(),
            replica: replica.to_string(),
            only_if_down,
        });

        let status = *self.delete_status.lock();
        if status == 0 {
            if let Some(s) = self
                .collections
                .lock()
                .get_mut(collection)
                .and_then(|c| c.shards.get_mut(shard))
            {
                s.replicas.remove(replica);
            }
        }
        Ok(header(status))
    }

    async fn request_status(&self, request_id: &str) -> Result<AsyncRequestStatus> {
        self.record(Call::Status(request_id.to_string()));
        if let Some(error) = self.status_error.lock().clone() {
            return Err(error);
        }
        let state = self
            .statuses
            .lock()
            .pop_front()
            .unwrap_or(AsyncState::Completed);
        Ok(AsyncRequestStatus::new(request_id, state))
    }

    async fn flush_request_status(&self) -> Result<AdminResponse> {
        self.record(Call::Flush);
        Ok(header(0))
    }

    async fn core_status(&self, node: Option<&str>, _core: Option<&str>) -> Result<AdminResponse> {
        self.record(Call::CoreStatus(node.map(str::to_string)));
        let mut status = serde_json::Map::new();
        for collection in self.collections.lock().values() {
            for (shard, replica) in collection.replicas() {
                if Some(replica.node_name.as_str()) == node {
                    let core = format!("{}_{}_{}", collection.name, shard.name, replica.id);
                    status.insert(core.clone(), json!({"name": core}));
                }
            }
        }
        Ok(AdminResponse::ok(
            json!({"responseHeader": {"status": 0}, "status": status}),
        ))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.lock().keys().cloned().collect())
    }
}

#[async_trait]
impl MetadataReader for FakeCluster {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        if let Some(reads) = self.list_budget.lock().as_mut() {
            if *reads == 0 {
                return Err(ClusterError::Metadata("coordination service gone".into()));
            }
            *reads -= 1;
        }
        Ok(self.collections.lock().keys().cloned().collect())
    }

    async fn get_collection_state(&self, collection: &str) -> Result<Collection> {
        self.collections
            .lock()
            .get(collection)
            .cloned()
            .ok_or_else(|| ClusterError::CollectionNotFound(collection.to_string()))
    }

    async fn list_live_nodes(&self) -> Result<BTreeSet<String>> {
        Ok(self.live_nodes.clone())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

pub fn replica(id: &str, node: &str, state: ReplicaState) -> Replica {
    let host_port = node.split('_').next().unwrap_or(node);
    Replica {
        id: id.to_string(),
        node_name: node.to_string(),
        core: format!("core_{}_{}", host_port.replace(':', "_"), id),
        state,
        base_url: format!("http://{}/solr", host_port),
        leader: false,
    }
}

pub fn shard(name: &str, replicas: Vec<Replica>) -> Shard {
    Shard {
        name: name.to_string(),
        state: ShardState::Active,
        range: None,
        replicas: replicas.into_iter().map(|r| (r.id.clone(), r)).collect(),
    }
}

pub fn collection(name: &str, shards: Vec<Shard>) -> Collection {
    Collection {
        name: name.to_string(),
        shards: shards.into_iter().map(|s| (s.name.clone(), s)).collect(),
    }
}

/// `c1/shard1` with `r1` on A and `r2` on B
pub fn two_replica_collection() -> Collection {
    collection(
        "c1",
        vec![shard(
            "shard1",
            vec![
                replica("r1", NODE_A, ReplicaState::Active),
                replica("r2", NODE_B, ReplicaState::Active),
            ],
        )],
    )
}

/// Migration settings that never sleep
pub fn fast_config() -> MigrationConfig {
    MigrationConfig {
        poll_interval_secs: 0,
        ..MigrationConfig::default()
    }
}
