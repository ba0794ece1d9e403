use super::print_json;
use crate::context::Context;
use anyhow::{bail, Result};
use solradmin::migration::StopReason;
use solradmin::{BatchMigrator, CollectionPlanOptions, DrainOptions};

/// Move replicas off `source` one at a time
pub async fn run_drain(
    ctx: &Context,
    source: &str,
    destination: Option<&str>,
    limit: usize,
    continue_on_error: bool,
    dry_run: bool,
) -> Result<()> {
    let migrator = BatchMigrator::new(ctx.engine(dry_run)?);
    let options = DrainOptions {
        destination_node: destination.map(str::to_string),
        limit,
        dry_run,
        continue_on_error,
        ..DrainOptions::new(source)
    };

    let summary = migrator
        .drain_node(&options, |candidate| println!("{}", candidate))
        .await?;
    print_json(&summary)?;

    if let StopReason::MetadataUnavailable(reason) = &summary.stop_reason {
        bail!(
            "Drain of {} stopped after {} moves ({} failed): {}",
            source,
            summary.attempted,
            summary.failures.len(),
            reason
        );
    }
    if !summary.is_success() {
        bail!(
            "{} of {} moves off {} failed",
            summary.failures.len(),
            summary.attempted,
            source
        );
    }
    Ok(())
}

/// Migrate whole collections off `source` with a worker pool
pub async fn run_migrate_collections(
    ctx: &Context,
    source: &str,
    destination: Option<&str>,
    limit: usize,
    workers: usize,
    dry_run: bool,
) -> Result<()> {
    let migrator = BatchMigrator::new(ctx.engine(dry_run)?);
    let options = CollectionPlanOptions {
        source_node: source.to_string(),
        destination_node: destination.map(str::to_string),
        limit,
    };

    let outcomes = migrator
        .migrate_collections(&options, workers, dry_run)
        .await?;
    for outcome in &outcomes {
        for report in &outcome.reports {
            println!(
                "{} {} {}",
                report.task.collection,
                report.task.shard,
                report.task.replica_id.as_deref().unwrap_or("-")
            );
        }
    }
    print_json(&outcomes)?;

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.success)
        .map(|o| o.collection.as_str())
        .collect();
    if !failed.is_empty() {
        bail!("Migration failed for: {}", failed.join(", "));
    }
    Ok(())
}
