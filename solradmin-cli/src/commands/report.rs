use super::print_json;
use crate::context::Context;
use anyhow::Result;
use solradmin::{CountFilter, FleetScanner};

fn scanner(ctx: &Context) -> Result<FleetScanner> {
    Ok(FleetScanner::new(ctx.metadata()?).with_progress(ctx.progress))
}

pub async fn run_replica_count(
    ctx: &Context,
    collection: Option<&str>,
    lt: Option<usize>,
    gt: Option<usize>,
) -> Result<()> {
    let rows = scanner(ctx)?
        .shard_replica_counts(collection, CountFilter::new(lt, gt))
        .await?;
    print_json(&rows)
}

pub async fn run_shard_count(
    ctx: &Context,
    collection: Option<&str>,
    lt: Option<usize>,
    gt: Option<usize>,
) -> Result<()> {
    let rows = scanner(ctx)?
        .collection_shard_counts(collection, CountFilter::new(lt, gt))
        .await?;
    print_json(&rows)
}

pub async fn run_node_counts(ctx: &Context) -> Result<()> {
    let rows = scanner(ctx)?.node_replica_counts().await?;
    print_json(&rows)
}

pub async fn run_unhealthy(ctx: &Context, collection: Option<&str>) -> Result<()> {
    let rows = scanner(ctx)?.unhealthy(collection).await?;
    print_json(&rows)
}
