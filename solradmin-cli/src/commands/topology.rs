use super::print_json;
use crate::context::Context;
use anyhow::{Context as _, Result};
use solradmin::{AdminApi, ClusterSnapshot, MetadataReader};
use std::path::Path;

/// Collection names from the coordination tree, or from `LIST` with `api`
pub async fn run_collections(ctx: &Context, api: bool) -> Result<()> {
    let names: Vec<String> = if api {
        ctx.admin()?.list_collections().await?
    } else {
        ctx.metadata()?.list_collections().await?.into_iter().collect()
    };
    print_json(&names)
}

pub async fn run_collection_state(ctx: &Context, collection: &str) -> Result<()> {
    let state = ctx.metadata()?.get_collection_state(collection).await?;
    print_json(&state)
}

pub async fn run_live_nodes(ctx: &Context) -> Result<()> {
    let nodes = ctx.metadata()?.list_live_nodes().await?;
    print_json(&nodes)
}

pub async fn run_snapshot(ctx: &Context, output: &Path) -> Result<()> {
    let metadata = ctx.metadata()?;
    let snapshot = ClusterSnapshot::capture(metadata.as_ref()).await?;
    snapshot
        .save(output)
        .with_context(|| format!("Failed to write snapshot to {}", output.display()))?;

    tracing::info!(
        path = %output.display(),
        collections = snapshot.collections.len(),
        live_nodes = snapshot.live_nodes.len(),
        "Snapshot written"
    );
    Ok(())
}
