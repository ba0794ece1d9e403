//! Configuration management for solradmin
//!
//! Default config location: ~/.solradmin.toml
//!
//! ```toml
//! [cluster]
//! solr_url = "http://solr-1:8983/solr"
//!
//! [retry]
//! max_retries = 3
//! retry_sleep_secs = 10
//!
//! [profiles.staging]
//! solr_url = "http://solr-staging:8983/solr"
//! ```

use crate::error::{ClusterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Named cluster profiles, selected with `--profile`
    #[serde(default)]
    pub profiles: BTreeMap<String, ClusterConfig>,
}

/// Where the cluster lives
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Base URL of any node, including the context path (e.g. `http://host:8983/solr`)
    #[serde(default = "default_solr_url")]
    pub solr_url: String,
    /// Node used to browse the coordination tree; defaults to `solr_url`
    #[serde(default)]
    pub metadata_url: Option<String>,
}

fn default_solr_url() -> String {
    "http://localhost:8983/solr".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            solr_url: default_solr_url(),
            metadata_url: None,
        }
    }
}

impl ClusterConfig {
    /// URL used for coordination tree reads
    pub fn metadata_url(&self) -> &str {
        self.metadata_url.as_deref().unwrap_or(&self.solr_url)
    }
}

/// Retry behaviour for admin API requests
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt on transport failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed sleep between attempts
    #[serde(default = "default_retry_sleep_secs")]
    pub retry_sleep_secs: u64,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_sleep_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_sleep_secs: default_retry_sleep_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetryConfig {
    pub fn retry_sleep(&self) -> Duration {
        Duration::from_secs(self.retry_sleep_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Replica migration tuning
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Seconds between async request status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Consecutive `notfound` polls tolerated before the task is declared lost
    #[serde(default = "default_max_missed_polls")]
    pub max_missed_polls: u32,
    /// Concurrent collection workers for `migrate --parallel`
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// First async request id handed out by a batch run
    #[serde(default = "default_first_request_id")]
    pub first_request_id: u64,
    /// Keep going after a failed move instead of stopping the batch
    #[serde(default)]
    pub continue_on_error: bool,
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_max_missed_polls() -> u32 {
    10
}

fn default_workers() -> usize {
    4
}

fn default_first_request_id() -> u64 {
    1000
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_missed_polls: default_max_missed_polls(),
            workers: default_workers(),
            first_request_id: default_first_request_id(),
            continue_on_error: false,
        }
    }
}

impl MigrationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Log output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_log_format(),
        }
    }
}

/// Default config file path (~/.solradmin.toml)
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".solradmin.toml")
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| ClusterError::Config("Cannot determine home directory".into()))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| ClusterError::Config("Cannot determine home directory".into()))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from a file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let path = expand_tilde(path)?;
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| {
            ClusterError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClusterError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the cluster section, optionally through a named profile
    pub fn cluster(&self, profile: Option<&str>) -> Result<ClusterConfig> {
        match profile {
            None | Some("default") | Some("DEFAULT") => Ok(self.cluster.clone()),
            Some(name) => self
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| ClusterError::Config(format!("unknown profile '{}'", name))),
        }
    }
}
