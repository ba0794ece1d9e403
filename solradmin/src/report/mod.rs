//! Read-only fleet reports
//!
//! Aggregates computed from the metadata reader and, for core counts, the
//! admin API. Nothing here mutates the cluster.

mod scanner;

pub use scanner::FleetScanner;

use serde::Serialize;

/// Optional `lt`/`gt` bounds on a count.
///
/// With no bound every row passes; otherwise a row passes when it satisfies
/// either bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountFilter {
    pub lt: Option<usize>,
    pub gt: Option<usize>,
}

impl CountFilter {
    pub fn new(lt: Option<usize>, gt: Option<usize>) -> Self {
        Self { lt, gt }
    }

    pub fn matches(&self, count: usize) -> bool {
        if self.lt.is_none() && self.gt.is_none() {
            return true;
        }
        self.lt.is_some_and(|lt| count < lt) || self.gt.is_some_and(|gt| count > gt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReplicaCount {
    pub node: String,
    pub replicas: usize,
    pub live: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardReplicaCount {
    pub collection: String,
    pub shard: String,
    pub replicas: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionShardCount {
    pub collection: String,
    pub shards: usize,
}

/// A shard or replica not in `active` state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unhealthy {
    Shard {
        collection: String,
        shard: String,
        state: String,
    },
    Replica {
        collection: String,
        shard: String,
        replica: String,
        node: String,
        state: String,
    },
}

/// Which nodes a core count covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeScope {
    /// Nodes registered under `/live_nodes`
    Live,
    /// Every node hosting at least one replica, live or not
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeCoreCount {
    pub node: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_filter() {
        let all = CountFilter::default();
        assert!(all.matches(0));
        assert!(all.matches(100));

        let lt = CountFilter::new(Some(2), None);
        assert!(lt.matches(1));
        assert!(!lt.matches(2));

        let either = CountFilter::new(Some(2), Some(3));
        assert!(either.matches(1));
        assert!(!either.matches(2));
        assert!(!either.matches(3));
        assert!(either.matches(4));
    }
}
