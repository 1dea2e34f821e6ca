//! Resolver configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file is
//! enough.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fresh::{DEFAULT_PEER_PREFIX, DEFAULT_SPOOL_EXTENSION};
use crate::index::ClickhouseTables;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Local spool of not-yet-archived submissions. Disabled when unset.
    pub spool_dir: Option<PathBuf>,

    /// Default: "post"
    pub spool_extension: String,

    /// Peer collectors, probed in this order.
    pub peer_hosts: Vec<String>,

    /// Default: "measurement_spool"
    pub peer_spool_prefix: String,

    /// Timeout for peer, container and index requests.
    /// Default: 10
    pub http_timeout_secs: u64,

    /// Default: 3600 (one hour)
    pub fresh_horizon_secs: u64,

    pub containers: ContainerConfig,

    pub index: IndexConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            spool_dir: None,
            spool_extension: DEFAULT_SPOOL_EXTENSION.to_string(),
            peer_hosts: Vec::new(),
            peer_spool_prefix: DEFAULT_PEER_PREFIX.to_string(),
            http_timeout_secs: 10,
            fresh_horizon_secs: 3600,
            containers: ContainerConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl ResolverConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data =
            std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_slice(&data).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn fresh_horizon(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.fresh_horizon_secs).unwrap_or(i64::MAX))
    }
}

/// Where archive containers are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContainerConfig {
    Local { root: PathBuf },
    Http { base_url: String },
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig::Local {
            root: PathBuf::from("archive"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexConfig {
    /// JSON-lines export loaded into memory at start-up.
    Jsonl { path: PathBuf },
    Clickhouse {
        url: String,
        #[serde(default)]
        database: Option<String>,
        #[serde(flatten)]
        tables: ClickhouseTables,
    },
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig::Jsonl {
            path: PathBuf::from("index.jsonl"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{"peer_hosts": ["a.example.org", "b.example.org"],
                "index": {"type": "clickhouse", "url": "http://localhost:8123", "uid_table": "fastpath_v2"}}"#,
        )
        .expect("parse");
        assert_eq!(config.peer_hosts.len(), 2);
        assert_eq!(config.spool_extension, "post");
        assert_eq!(config.peer_spool_prefix, "measurement_spool");
        assert_eq!(config.fresh_horizon(), time::Duration::hours(1));
        assert!(matches!(config.containers, ContainerConfig::Local { .. }));
        match config.index {
            IndexConfig::Clickhouse { tables, database, .. } => {
                assert_eq!(tables.uid_table, "fastpath_v2");
                assert_eq!(tables.frames_table, "report_frames");
                assert!(database.is_none());
            }
            other => panic!("unexpected index config {other:?}"),
        }
    }

    #[test]
    fn http_containers_config() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{"containers": {"type": "http", "base_url": "https://bucket.example.com/"}}"#,
        )
        .expect("parse");
        assert!(matches!(config.containers, ContainerConfig::Http { .. }));
    }
}
