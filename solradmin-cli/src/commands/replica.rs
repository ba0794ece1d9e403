use super::print_json;
use crate::context::Context;
use anyhow::{bail, Context as _, Result};
use solradmin::migration::await_completion;
use solradmin::{AdminApi, MetadataReader, MoveRequest};

/// Add a replica, then wait for the async request when an id is given
pub async fn run_add_replica(
    ctx: &Context,
    collection: &str,
    shard: &str,
    node: Option<&str>,
    request_id: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        let state = ctx
            .metadata()?
            .get_collection_state(collection)
            .await
            .with_context(|| format!("Failed to read state of '{}'", collection))?;
        let Some(target) = state.shard(shard) else {
            bail!("Collection '{}' has no shard '{}'", collection, shard);
        };
        if let Some(existing) = node.and_then(|n| target.replica_on_node(n)) {
            bail!(
                "Node {} already hosts replica {} of {}/{}",
                existing.node_name,
                existing.id,
                collection,
                shard
            );
        }
        tracing::info!(
            collection = collection,
            shard = shard,
            node = node.unwrap_or("<any>"),
            replicas = target.replicas.len(),
            "Dry run: would add replica"
        );
        return Ok(());
    }

    let admin = ctx.admin()?;
    let response = admin
        .add_replica(collection, shard, node, request_id)
        .await
        .context("ADDREPLICA request failed")?;
    print_json(&response)?;
    if !response.is_success() {
        bail!("ADDREPLICA rejected: {}", response.error_message());
    }

    if let Some(id) = request_id {
        let migration = &ctx.config.migration;
        let status = await_completion(
            admin.as_ref(),
            id,
            migration.poll_interval(),
            migration.max_missed_polls,
        )
        .await?;
        print_json(&status)?;
    }
    Ok(())
}

pub async fn run_delete_replica(
    ctx: &Context,
    collection: &str,
    shard: &str,
    replica: &str,
    only_if_down: bool,
    async_id: Option<&str>,
) -> Result<()> {
    let response = ctx
        .admin()?
        .delete_replica(collection, shard, replica, only_if_down, async_id)
        .await
        .context("DELETEREPLICA request failed")?;
    print_json(&response)?;
    if !response.is_success() {
        bail!("DELETEREPLICA rejected: {}", response.error_message());
    }
    Ok(())
}

pub async fn run_move_replica(ctx: &Context, request: &MoveRequest) -> Result<()> {
    let engine = ctx.engine(request.dry_run)?;
    let report = engine.move_replica(request).await;
    print_json(&report)?;

    match &report.error {
        None => Ok(()),
        Some(e) if e.replica_orphaned() => bail!(
            "Move of {}/{} failed in {}: {}. Check the shard for an extra replica",
            request.collection,
            request.shard,
            e.phase(),
            e
        ),
        Some(e) => bail!("Move of {}/{} failed: {}", request.collection, request.shard, e),
    }
}

pub async fn run_request_status(
    ctx: &Context,
    request_id: Option<&str>,
    flush: bool,
) -> Result<()> {
    let admin = ctx.admin()?;
    if flush {
        let response = admin.flush_request_status().await?;
        print_json(&response)?;
        if !response.is_success() {
            bail!("DELETESTATUS rejected: {}", response.error_message());
        }
        return Ok(());
    }

    let Some(id) = request_id else {
        bail!("A request id is required unless --flush is given");
    };
    let status = admin.request_status(id).await?;
    print_json(&status)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solradmin::{parse_collection_state, ClusterSnapshot, Config};
    use std::collections::BTreeMap;
    use std::path::Path;

    const STATE: &str = r#"{
        "logs": {
            "shards": {
                "shard1": {
                    "state": "active",
                    "replicas": {
                        "core_node1": {
                            "core": "logs_shard1_replica_n1",
                            "base_url": "http://10.0.0.1:8983/solr",
                            "node_name": "10.0.0.1:8983_solr",
                            "state": "active"
                        }
                    }
                }
            }
        }
    }"#;

    fn snapshot_context(dir: &Path) -> Context {
        let logs = parse_collection_state("logs", STATE.as_bytes()).unwrap();
        let path = dir.join("snapshot.json");
        ClusterSnapshot::new(
            ["10.0.0.1:8983_solr".to_string()].into_iter().collect(),
            BTreeMap::from([("logs".to_string(), logs)]),
        )
        .save(&path)
        .unwrap();

        let config = Config::default();
        Context {
            cluster: config.cluster.clone(),
            config,
            snapshot: Some(path),
            progress: false,
        }
    }

    #[tokio::test]
    async fn test_dry_run_add_fails_on_occupied_node() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = snapshot_context(dir.path());

        let err = run_add_replica(&ctx, "logs", "shard1", Some("10.0.0.1:8983_solr"), None, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already hosts replica core_node1"));
    }

    #[tokio::test]
    async fn test_dry_run_add_to_free_node_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = snapshot_context(dir.path());

        run_add_replica(&ctx, "logs", "shard1", Some("10.0.0.2:8983_solr"), None, true)
            .await
            .unwrap();
        assert!(run_add_replica(&ctx, "logs", "shard9", None, None, true)
            .await
            .is_err());
    }
}
