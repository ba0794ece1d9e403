use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod context;
mod logging;

use context::Context;

#[derive(Parser, Debug)]
#[command(name = "solradmin")]
#[command(about = "solradmin - SolrCloud replica management and reporting")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.solradmin.toml)
    #[arg(long, global = true, env = "SOLRADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Named cluster profile from the config file
    #[arg(long, global = true, env = "SOLRADMIN_PROFILE")]
    profile: Option<String>,

    /// Cluster URL, e.g. solrcloud:8983/solr (overrides the config file)
    #[arg(long, global = true, env = "SOLR_URL")]
    url: Option<String>,

    /// Read topology from a snapshot file instead of the live cluster
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Turn on debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Show progress bars during scans
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a replica of a shard
    AddReplica {
        #[arg(short, long)]
        collection: String,

        #[arg(long)]
        shard: String,

        /// Node to create the replica on; the cluster picks one when omitted
        #[arg(short, long = "destination-node")]
        destination: Option<String>,

        /// Async request id; the command waits for it to complete
        #[arg(long)]
        request_id: Option<String>,

        /// Check the shard exists without adding anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a replica of a shard
    DeleteReplica {
        #[arg(short, long)]
        collection: String,

        #[arg(long)]
        shard: String,

        /// Replica id, e.g. core_node3
        #[arg(short, long)]
        replica: String,

        /// Only delete when the replica is down
        #[arg(long)]
        only_if_down: bool,

        /// Async request id
        #[arg(long = "async")]
        async_id: Option<String>,
    },

    /// Move a shard replica from one node to another
    MoveReplica {
        #[arg(short, long)]
        collection: String,

        #[arg(long)]
        shard: String,

        /// Source node name, e.g. 10.0.0.1:8983_solr
        #[arg(short, long)]
        source: String,

        /// Destination node name
        #[arg(short, long)]
        destination: String,

        /// Replica to move when the source node holds more than one of the shard
        #[arg(long)]
        replica: Option<String>,

        /// Async request id for the add; polled until it completes
        #[arg(long = "async")]
        async_id: Option<String>,

        /// Skip the check that the destination has no replica of the shard
        #[arg(long)]
        no_validate: bool,

        #[arg(long)]
        dry_run: bool,
    },

    /// Move replicas off a node, one at a time or per collection in parallel
    Migrate {
        /// Source node name
        #[arg(short, long)]
        source: String,

        /// Destination node name; the cluster picks one when omitted
        #[arg(short, long)]
        destination: Option<String>,

        /// Moves (or collections with --parallel) to attempt; 0 means all
        #[arg(long, default_value = "0")]
        limit: usize,

        /// Migrate whole collections with a worker pool
        #[arg(long)]
        parallel: bool,

        /// Worker count for --parallel (default from config)
        #[arg(long)]
        workers: Option<usize>,

        /// Keep going after a failed move
        #[arg(long)]
        continue_on_error: bool,

        #[arg(long)]
        dry_run: bool,
    },

    /// Show the state of an async request, or flush all stored statuses
    RequestStatus {
        /// Async request id
        #[arg(required_unless_present = "flush")]
        request_id: Option<String>,

        /// Delete every stored request status
        #[arg(long, conflicts_with = "request_id")]
        flush: bool,
    },

    /// Core STATUS of a node
    CoreStatus {
        /// Node name; defaults to the cluster URL
        #[arg(short, long)]
        node: Option<String>,

        /// Single core to report on
        #[arg(long)]
        core: Option<String>,

        /// List cores as collection/shard/replica instead of the raw response
        #[arg(long)]
        parse: bool,
    },

    /// Count cores on each node
    CoreCount {
        /// Every node hosting a replica, live or not
        #[arg(long, conflicts_with = "live")]
        all: bool,

        /// Live nodes only (default)
        #[arg(long)]
        live: bool,
    },

    /// List collection names
    Collections {
        /// Ask the Collections API instead of the coordination tree
        #[arg(long)]
        api: bool,
    },

    /// Show the shard tree of a collection
    CollectionState {
        collection: String,
    },

    /// List live nodes
    LiveNodes,

    /// Replicas per shard
    ReplicaCount {
        /// Single collection
        #[arg(short, long)]
        collection: Option<String>,

        /// Only shards with fewer replicas
        #[arg(long)]
        lt: Option<usize>,

        /// Only shards with more replicas
        #[arg(long)]
        gt: Option<usize>,
    },

    /// Shards per collection
    ShardCount {
        #[arg(short, long)]
        collection: Option<String>,

        #[arg(long)]
        lt: Option<usize>,

        #[arg(long)]
        gt: Option<usize>,
    },

    /// Replicas hosted by each node
    NodeCounts,

    /// Shards and replicas that are not active
    Unhealthy {
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Delete replicas stuck in down state
    DeleteDown {
        #[arg(short, long)]
        collection: Option<String>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Write the cluster topology to a JSON file
    Snapshot {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Number of documents in a collection
    DocCount {
        collection: String,

        /// Node to count on; defaults to the cluster URL
        #[arg(short, long)]
        node: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = Context::load(
        cli.config.as_deref(),
        cli.profile.as_deref(),
        cli.url.as_deref(),
        cli.snapshot,
        cli.progress,
    )?;
    logging::init(&ctx.config.logging, cli.debug, cli.log_format);

    match cli.command {
        Commands::AddReplica {
            collection,
            shard,
            destination,
            request_id,
            dry_run,
        } => {
            commands::run_add_replica(
                &ctx,
                &collection,
                &shard,
                destination.as_deref(),
                request_id.as_deref(),
                dry_run,
            )
            .await?;
        }
        Commands::DeleteReplica {
            collection,
            shard,
            replica,
            only_if_down,
            async_id,
        } => {
            commands::run_delete_replica(
                &ctx,
                &collection,
                &shard,
                &replica,
                only_if_down,
                async_id.as_deref(),
            )
            .await?;
        }
        Commands::MoveReplica {
            collection,
            shard,
            source,
            destination,
            replica,
            async_id,
            no_validate,
            dry_run,
        } => {
            let request = solradmin::MoveRequest::new(&collection, &shard, &source)
                .with_replica(replica.as_deref())
                .with_destination(Some(&destination))
                .with_async_id(async_id)
                .validate(!no_validate)
                .dry_run(dry_run);
            commands::run_move_replica(&ctx, &request).await?;
        }
        Commands::Migrate {
            source,
            destination,
            limit,
            parallel,
            workers,
            continue_on_error,
            dry_run,
        } => {
            if parallel {
                let workers = workers.unwrap_or(ctx.config.migration.workers);
                commands::run_migrate_collections(
                    &ctx,
                    &source,
                    destination.as_deref(),
                    limit,
                    workers,
                    dry_run,
                )
                .await?;
            } else {
                let continue_on_error =
                    continue_on_error || ctx.config.migration.continue_on_error;
                commands::run_drain(
                    &ctx,
                    &source,
                    destination.as_deref(),
                    limit,
                    continue_on_error,
                    dry_run,
                )
                .await?;
            }
        }
        Commands::RequestStatus { request_id, flush } => {
            commands::run_request_status(&ctx, request_id.as_deref(), flush).await?;
        }
        Commands::CoreStatus { node, core, parse } => {
            commands::run_core_status(&ctx, node.as_deref(), core.as_deref(), parse).await?;
        }
        Commands::CoreCount { all, live: _ } => {
            let scope = if all {
                solradmin::NodeScope::All
            } else {
                solradmin::NodeScope::Live
            };
            commands::run_core_count(&ctx, scope).await?;
        }
        Commands::Collections { api } => {
            commands::run_collections(&ctx, api).await?;
        }
        Commands::CollectionState { collection } => {
            commands::run_collection_state(&ctx, &collection).await?;
        }
        Commands::LiveNodes => {
            commands::run_live_nodes(&ctx).await?;
        }
        Commands::ReplicaCount { collection, lt, gt } => {
            commands::run_replica_count(&ctx, collection.as_deref(), lt, gt).await?;
        }
        Commands::ShardCount { collection, lt, gt } => {
            commands::run_shard_count(&ctx, collection.as_deref(), lt, gt).await?;
        }
        Commands::NodeCounts => {
            commands::run_node_counts(&ctx).await?;
        }
        Commands::Unhealthy { collection } => {
            commands::run_unhealthy(&ctx, collection.as_deref()).await?;
        }
        Commands::DeleteDown {
            collection,
            dry_run,
        } => {
            commands::run_delete_down(&ctx, collection.as_deref(), dry_run).await?;
        }
        Commands::Snapshot { output } => {
            commands::run_snapshot(&ctx, &output).await?;
        }
        Commands::DocCount { collection, node } => {
            commands::run_doc_count(&ctx, &collection, node.as_deref()).await?;
        }
    }

    Ok(())
}
