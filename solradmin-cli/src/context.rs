//! Config resolution and client construction shared by all commands

use anyhow::{bail, Context as _, Result};
use solradmin::config::{default_config_path, ClusterConfig, Config};
use solradmin::{
    MetadataReader, MigrationEngine, SnapshotReader, SolrAdminClient, ZkTreeReader,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Context {
    pub config: Config,
    pub cluster: ClusterConfig,
    pub snapshot: Option<PathBuf>,
    pub progress: bool,
}

impl Context {
    pub fn load(
        config_path: Option<&Path>,
        profile: Option<&str>,
        url: Option<&str>,
        snapshot: Option<PathBuf>,
        progress: bool,
    ) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);
        let config = Config::load_or_default(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        let mut cluster = config.cluster(profile)?;
        if let Some(url) = url {
            cluster.solr_url = url.to_string();
        }

        Ok(Self {
            config,
            cluster,
            snapshot,
            progress,
        })
    }

    pub fn admin(&self) -> Result<Arc<SolrAdminClient>> {
        let client = SolrAdminClient::from_config(&self.cluster, &self.config.retry)
            .with_context(|| format!("Invalid cluster URL '{}'", self.cluster.solr_url))?;
        Ok(Arc::new(client))
    }

    /// Snapshot file when `--snapshot` was given, the live cluster otherwise
    pub fn metadata(&self) -> Result<Arc<dyn MetadataReader>> {
        match &self.snapshot {
            Some(path) => {
                let reader = SnapshotReader::from_file(path)
                    .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
                Ok(Arc::new(reader))
            }
            None => {
                let reader =
                    ZkTreeReader::new(self.cluster.metadata_url(), self.config.retry.timeout())
                        .with_context(|| {
                            format!("Invalid metadata URL '{}'", self.cluster.metadata_url())
                        })?;
                Ok(Arc::new(reader))
            }
        }
    }

    /// Metadata for commands that mutate the cluster; a snapshot is only
    /// accepted for dry runs
    pub fn live_metadata(&self, dry_run: bool) -> Result<Arc<dyn MetadataReader>> {
        if self.snapshot.is_some() && !dry_run {
            bail!("--snapshot is read-only; use it with --dry-run or a report command");
        }
        self.metadata()
    }

    pub fn engine(&self, dry_run: bool) -> Result<MigrationEngine> {
        Ok(MigrationEngine::new(
            self.admin()?,
            self.live_metadata(dry_run)?,
            self.config.migration.clone(),
        ))
    }
}
