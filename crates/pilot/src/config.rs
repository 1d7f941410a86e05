//! Cluster configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use node::{Config, ConfigError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Configuration shared by every node
    #[serde(default)]
    pub node: Config,
    /// Coordination service address
    #[serde(default = "default_coordinator_address")]
    pub coordinator_address: String,
    /// Bound on synchronous admin waits
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    /// Re-read interval of the wait helpers
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Where the cluster state is saved on shutdown
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node: Config::default(),
            coordinator_address: default_coordinator_address(),
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            data_dir: None,
        }
    }
}

impl ClusterConfig {
    /// Cluster rooted at `base_dir`: node data and cluster state live under it
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let mut config = Self::default();
        config.node.node.data_dir = base_dir.join("nodes");
        config.data_dir = Some(base_dir.join("pilot"));
        config
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_coordinator_address() -> String {
    "127.0.0.1:9983".to_string()
}

fn default_wait_timeout_secs() -> u64 {
    45
}

fn default_poll_interval_ms() -> u64 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml() {
        let config = ClusterConfig::from_yaml(
            r#"
coordinator_address: 10.0.0.1:2181
wait_timeout_secs: 5
node:
  node:
    base_port: 7000
"#,
        )
        .unwrap();
        assert_eq!(config.coordinator_address, "10.0.0.1:2181");
        assert_eq!(config.wait_timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.node.node.base_port, 7000);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_with_base_dir() {
        let config = ClusterConfig::with_base_dir("/tmp/cluster");
        assert_eq!(config.node.node.data_dir, PathBuf::from("/tmp/cluster/nodes"));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/cluster/pilot")));
    }
}
