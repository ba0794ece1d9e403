//! Coordination tree browsing over the `/admin/zookeeper` endpoint

use super::MetadataReader;
use crate::admin::normalize_base_url;
use crate::error::{ClusterError, Result};
use crate::topology::{parse_collection_state, Collection};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

const COLLECTIONS_PATH: &str = "/collections";
const LIVE_NODES_PATH: &str = "/live_nodes";

/// Reads znodes through a node's tree browser.
///
/// Child listings come back as
/// `{"tree":[{"data":{"title":"/live_nodes"},"children":[{"data":{"title":"a:8983_solr"}}]}]}`
/// and znode payloads as `{"znode":{"data":"..."}}`.
#[derive(Clone)]
pub struct ZkTreeReader {
    client: Client,
    base_url: String,
}

impl ZkTreeReader {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        Url::parse(&base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn browse(&self, path: &str) -> Result<Option<Value>> {
        let url = format!("{}/admin/zookeeper", self.base_url);
        debug!(path = %path, "Browsing coordination tree");

        let response = self
            .client
            .get(&url)
            .query(&[("detail", "true"), ("path", path), ("wt", "json")])
            .send()
            .await
            .map_err(|e| ClusterError::Metadata(format!("{}: {}", path, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterError::Metadata(format!(
                "{}: HTTP {}: {}",
                path, status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClusterError::Metadata(format!("{}: invalid JSON: {}", path, e)))?;
        Ok(Some(body))
    }

    async fn children(&self, path: &str) -> Result<BTreeSet<String>> {
        let body = self
            .browse(path)
            .await?
            .ok_or_else(|| ClusterError::Metadata(format!("{}: no such znode", path)))?;
        Ok(child_titles(&body))
    }
}

/// Titles of the children of the first tree entry
fn child_titles(body: &Value) -> BTreeSet<String> {
    body.pointer("/tree/0/children")
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|c| c.pointer("/data/title").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn znode_data(body: &Value) -> Option<&str> {
    body.pointer("/znode/data")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())
}

#[async_trait]
impl MetadataReader for ZkTreeReader {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        self.children(COLLECTIONS_PATH).await
    }

    async fn get_collection_state(&self, collection: &str) -> Result<Collection> {
        let path = format!("{}/{}/state.json", COLLECTIONS_PATH, collection);
        let body = self
            .browse(&path)
            .await?
            .ok_or_else(|| ClusterError::CollectionNotFound(collection.to_string()))?;
        let data = znode_data(&body)
            .ok_or_else(|| ClusterError::CollectionNotFound(collection.to_string()))?;
        parse_collection_state(collection, data.as_bytes())
    }

    async fn list_live_nodes(&self) -> Result<BTreeSet<String>> {
        self.children(LIVE_NODES_PATH).await
    }

    fn backend_name(&self) -> &'static str {
        "zk_tree"
    }
}
