use super::print_json;
use crate::context::Context;
use anyhow::{bail, Context as _, Result};
use serde::Serialize;
use serde_json::Value;
use solradmin::topology::{node_base_url, parse_core_name};
use solradmin::{AdminApi, FleetScanner, NodeScope};

#[derive(Serialize)]
struct CoreRow<'a> {
    core: &'a str,
    collection: Option<String>,
    shard: Option<String>,
    replica: Option<String>,
}

pub async fn run_core_status(
    ctx: &Context,
    node: Option<&str>,
    core: Option<&str>,
    parse: bool,
) -> Result<()> {
    let response = ctx.admin()?.core_status(node, core).await?;
    if !response.is_success() {
        print_json(&response)?;
        bail!("Core STATUS rejected: {}", response.error_message());
    }
    if !parse {
        return print_json(&response.body);
    }

    let rows: Vec<CoreRow> = response
        .body
        .get("status")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|status| status.keys())
        .map(|name| {
            let parsed = parse_core_name(name);
            CoreRow {
                core: name,
                collection: parsed.as_ref().map(|p| p.collection.clone()),
                shard: parsed.as_ref().map(|p| p.shard.clone()),
                replica: parsed.map(|p| p.replica),
            }
        })
        .collect();
    print_json(&rows)
}

pub async fn run_core_count(ctx: &Context, scope: NodeScope) -> Result<()> {
    let admin = ctx.admin()?;
    let scanner = FleetScanner::new(ctx.metadata()?).with_progress(ctx.progress);
    let rows = scanner.core_counts(admin.as_ref(), scope).await?;
    print_json(&rows)?;

    let unreachable = rows.iter().filter(|r| r.error.is_some()).count();
    if unreachable > 0 {
        bail!("{} node(s) could not report their cores", unreachable);
    }
    Ok(())
}

pub async fn run_doc_count(ctx: &Context, collection: &str, node: Option<&str>) -> Result<()> {
    let admin = ctx.admin()?;
    let base_url = match node {
        Some(node) => node_base_url(node)?,
        None => admin.base_url().to_string(),
    };
    let count = admin
        .document_count(&base_url, collection)
        .await
        .with_context(|| format!("Failed to count documents in '{}'", collection))?;
    print_json(&serde_json::json!({ "collection": collection, "count": count }))
}
