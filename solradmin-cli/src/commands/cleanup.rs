use super::print_json;
use crate::context::Context;
use anyhow::{bail, Result};
use solradmin::DownReplicaCleaner;

/// Delete down replicas from shards that still have an active copy
pub async fn run_delete_down(
    ctx: &Context,
    collection: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let cleaner = DownReplicaCleaner::new(ctx.admin()?, ctx.live_metadata(dry_run)?);
    let report = cleaner.run(collection, dry_run).await?;
    print_json(&report)?;

    if report.failed() > 0 {
        bail!("{} down replica(s) could not be deleted", report.failed());
    }
    Ok(())
}
