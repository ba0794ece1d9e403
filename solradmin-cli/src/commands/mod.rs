pub mod cleanup;
pub mod cores;
pub mod migrate;
pub mod replica;
pub mod report;
pub mod topology;

pub use cleanup::run_delete_down;
pub use cores::{run_core_count, run_core_status, run_doc_count};
pub use migrate::{run_drain, run_migrate_collections};
pub use replica::{run_add_replica, run_delete_replica, run_move_replica, run_request_status};
pub use report::{run_node_counts, run_replica_count, run_shard_count, run_unhealthy};
pub use topology::{run_collection_state, run_collections, run_live_nodes, run_snapshot};

use anyhow::Result;
use serde::Serialize;

/// Pretty JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
