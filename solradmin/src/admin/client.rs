//! HTTP implementation of [`AdminApi`]

use super::{
    normalize_base_url, AdminApi, AdminRequest, AdminResponse, AsyncRequestStatus, RetryPolicy,
};
use crate::config::{ClusterConfig, RetryConfig};
use crate::error::{ClusterError, Result};
use crate::metrics::AdminTimer;
use crate::topology::node_base_url;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Admin client bound to one cluster URL.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct SolrAdminClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl SolrAdminClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        Url::parse(&base_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            retry,
        })
    }

    pub fn from_config(cluster: &ClusterConfig, retry: &RetryConfig) -> Result<Self> {
        Self::new(
            &cluster.solr_url,
            retry.timeout(),
            RetryPolicy::from_config(retry),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send `request` to the configured cluster URL
    pub async fn execute(&self, request: &AdminRequest) -> Result<AdminResponse> {
        self.execute_at(&self.base_url, request).await
    }

    /// Send `request` to an arbitrary node base URL
    pub async fn execute_at(
        &self,
        base_url: &str,
        request: &AdminRequest,
    ) -> Result<AdminResponse> {
        let url = format!("{}{}", base_url, request.endpoint().path());
        let query = request.query_pairs();
        let timer = AdminTimer::new(request.action());

        let result = self
            .retry
            .run(request.action(), || self.send_once(&url, &query))
            .await;

        match &result {
            Ok(response) => timer.response(response.http_status),
            Err(e) => timer.error(e.error_type()),
        }
        result
    }

    async fn send_once(&self, url: &str, query: &[(&str, String)]) -> Result<AdminResponse> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await?;
        let http_status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        debug!(url = %url, http_status = http_status, "Admin response");
        Ok(AdminResponse::new(http_status, body))
    }

    /// Number of documents in `collection` as seen from `base_url`
    pub async fn document_count(&self, base_url: &str, collection: &str) -> Result<u64> {
        let url = format!("{}/{}/select", normalize_base_url(base_url), collection);
        let timer = AdminTimer::new("SELECT");

        let query = [
            ("q", "*:*".to_string()),
            ("rows", "0".to_string()),
            ("wt", "json".to_string()),
        ];

        let result = self
            .retry
            .run("SELECT", || self.send_once(&url, &query))
            .await;

        let response = match result {
            Ok(response) => {
                timer.response(response.http_status);
                response
            }
            Err(e) => {
                timer.error(e.error_type());
                return Err(e);
            }
        };

        if !response.is_success() {
            return Err(ClusterError::UnexpectedResponse(format!(
                "count for '{}': {}",
                collection,
                response.error_message()
            )));
        }
        response
            .body
            .pointer("/response/numFound")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ClusterError::UnexpectedResponse(format!(
                    "count for '{}': no response.numFound",
                    collection
                ))
            })
    }
}

#[async_trait]
impl AdminApi for SolrAdminClient {
    async fn add_replica(
        &self,
        collection: &str,
        shard: &str,
        node: Option<&str>,
        async_id: Option<&str>,
    ) -> Result<AdminResponse> {
        let request = AdminRequest::collections("ADDREPLICA")
            .param("collection", collection)
            .param("shard", shard)
            .opt_param("node", node)
            .opt_param("async", async_id);
        self.execute(&request).await
    }

    async fn delete_replica(
        &self,
        collection: &str,
        shard: &str,
        replica: &str,
        only_if_down: bool,
        async_id: Option<&str>,
    ) -> Result<AdminResponse> {
        let request = AdminRequest::collections("DELETEREPLICA")
            .param("collection", collection)
            .param("shard", shard)
            .param("replica", replica)
            .flag("onlyIfDown", only_if_down)
            .opt_param("async", async_id);
        self.execute(&request).await
    }

    async fn request_status(&self, request_id: &str) -> Result<AsyncRequestStatus> {
        let request = AdminRequest::collections("REQUESTSTATUS").param("requestid", request_id);
        let response = self.execute(&request).await?;
        AsyncRequestStatus::from_response(request_id, &response)
    }

    async fn flush_request_status(&self) -> Result<AdminResponse> {
        let request = AdminRequest::collections("DELETESTATUS").flag("flush", true);
        self.execute(&request).await
    }

    async fn core_status(&self, node: Option<&str>, core: Option<&str>) -> Result<AdminResponse> {
        let request = AdminRequest::cores("STATUS").opt_param("core", core);
        match node {
            Some(node) => {
                let base_url = node_base_url(node)?;
                self.execute_at(&base_url, &request).await
            }
            None => self.execute(&request).await,
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self.execute(&AdminRequest::collections("LIST")).await?;
        if !response.is_success() {
            return Err(ClusterError::UnexpectedResponse(format!(
                "LIST: {}",
                response.error_message()
            )));
        }
        let collections = response
            .body
            .get("collections")
            .and_then(Value::as_array)
            .ok_or_else(|| ClusterError::UnexpectedResponse("LIST: no collections array".into()))?;
        Ok(collections
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }
}
