//! Parser for `/collections/<name>/state.json`
//!
//! The blob is walked by hand rather than deserialized into loose maps so
//! that every unexpected shape produces an error naming the exact path.

use super::{Collection, Replica, ReplicaState, Shard, ShardState};
use crate::error::{ClusterError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Parse a raw `state.json` blob for `collection`.
///
/// The blob is keyed by collection name:
///
/// ```json
/// {"c1": {"shards": {"shard1": {"state": "active", "replicas": {
///     "core_node1": {"core": "c1_shard1_replica1", "node_name": "a:8983_solr",
///                    "base_url": "http://a:8983/solr", "state": "active"}}}}}}
/// ```
pub fn parse_collection_state(collection: &str, data: &[u8]) -> Result<Collection> {
    let root: Value = serde_json::from_slice(data).map_err(|e| {
        ClusterError::MalformedTopology(format!(
            "collection '{}': state.json is not valid JSON: {}",
            collection, e
        ))
    })?;

    let body = root.get(collection).ok_or_else(|| {
        ClusterError::MalformedTopology(format!(
            "state.json has no entry for collection '{}'",
            collection
        ))
    })?;

    parse_collection_body(collection, body)
}

fn parse_collection_body(collection: &str, body: &Value) -> Result<Collection> {
    let ctx = format!("collection '{}'", collection);
    let body = as_object(body, &ctx)?;
    let shards_value = body
        .get("shards")
        .ok_or_else(|| malformed(&ctx, "missing field 'shards'"))?;
    let shards_obj = as_object(shards_value, &format!("{} shards", ctx))?;

    let mut shards = BTreeMap::new();
    for (shard_name, shard_value) in shards_obj {
        let shard = parse_shard(&ctx, shard_name, shard_value)?;
        shards.insert(shard_name.clone(), shard);
    }

    Ok(Collection {
        name: collection.to_string(),
        shards,
    })
}

fn parse_shard(parent: &str, name: &str, value: &Value) -> Result<Shard> {
    let ctx = format!("{} shard '{}'", parent, name);
    let obj = as_object(value, &ctx)?;

    let state = ShardState::from(required_str(obj, "state", &ctx)?.to_string());
    let range = match obj.get("range") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(malformed(&ctx, "field 'range' is not a string")),
    };

    let mut replicas = BTreeMap::new();
    match obj.get("replicas") {
        // A shard mid-split may briefly publish no replica map at all
        None => {}
        Some(value) => {
            let replicas_obj = as_object(value, &format!("{} replicas", ctx))?;
            for (id, replica_value) in replicas_obj {
                replicas.insert(id.clone(), parse_replica(&ctx, id, replica_value)?);
            }
        }
    }

    Ok(Shard {
        name: name.to_string(),
        state,
        range,
        replicas,
    })
}

fn parse_replica(parent: &str, id: &str, value: &Value) -> Result<Replica> {
    let ctx = format!("{} replica '{}'", parent, id);
    let obj = as_object(value, &ctx)?;

    let leader = match obj.get("leader") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        Some(_) => return Err(malformed(&ctx, "field 'leader' is not a boolean")),
    };

    Ok(Replica {
        id: id.to_string(),
        node_name: required_str(obj, "node_name", &ctx)?.to_string(),
        core: required_str(obj, "core", &ctx)?.to_string(),
        state: ReplicaState::from(required_str(obj, "state", &ctx)?.to_string()),
        base_url: required_str(obj, "base_url", &ctx)?.to_string(),
        leader,
    })
}

fn as_object<'a>(value: &'a Value, ctx: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| malformed(ctx, "expected a JSON object"))
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &str, ctx: &str) -> Result<&'a str> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(malformed(ctx, &format!("field '{}' is not a string", field))),
        None => Err(malformed(ctx, &format!("missing field '{}'", field))),
    }
}

fn malformed(ctx: &str, what: &str) -> ClusterError {
    ClusterError::MalformedTopology(format!("{}: {}", ctx, what))
}
