//! Configuration module for a search node
//!
//! Supports YAML configuration files with module-based organization

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use index::{IndexWriterConfig, MergeScheduler, PolicySettings};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Node configuration
    #[serde(default)]
    pub node: NodeConfig,
    /// Index engine configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Replica recovery configuration
    #[serde(default)]
    pub recovery: RecoveryConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to YAML file
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let yaml =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, yaml).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        self.node.merge(other.node);
        self.index.merge(other.index);
        self.recovery.merge(other.recovery);
        self.log.merge(other.log);
    }
}

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Host part of node names and addresses
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the first node; later nodes count up from it
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Context path appended to node names (`host:port_<context>`)
    #[serde(default = "default_context")]
    pub context: String,
    /// Root under which every node keeps its data directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            base_port: default_base_port(),
            context: default_context(),
            data_dir: default_data_dir(),
        }
    }
}

impl NodeConfig {
    fn merge(&mut self, other: Self) {
        if !other.host.is_empty() {
            self.host = other.host;
        }
        if other.base_port > 0 {
            self.base_port = other.base_port;
        }
        if !other.context.is_empty() {
            self.context = other.context;
        }
        if !other.data_dir.as_os_str().is_empty() {
            self.data_dir = other.data_dir;
        }
    }

    /// Node name for `port`, e.g. `127.0.0.1:8983_search`
    pub fn node_name(&self, port: u16) -> String {
        format!("{}:{}_{}", self.host, port, self.context)
    }

    /// Base URL for `port`
    pub fn base_url(&self, port: u16) -> String {
        format!("http://{}:{}/{}", self.host, port, self.context)
    }
}

/// Index engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Process-wide switch for `SortingMergePolicyFactory`
    #[serde(default = "default_sorting_merge_policy_enabled")]
    pub sorting_merge_policy_enabled: bool,
    /// Auto-flush threshold, unset for flush-on-commit only
    #[serde(default)]
    pub max_buffered_docs: Option<usize>,
    #[serde(default)]
    pub merge_scheduler: MergeScheduler,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            sorting_merge_policy_enabled: default_sorting_merge_policy_enabled(),
            max_buffered_docs: None,
            merge_scheduler: MergeScheduler::default(),
        }
    }
}

impl IndexConfig {
    fn merge(&mut self, other: Self) {
        self.sorting_merge_policy_enabled = other.sorting_merge_policy_enabled;
        if other.max_buffered_docs.is_some() {
            self.max_buffered_docs = other.max_buffered_docs;
        }
        self.merge_scheduler = other.merge_scheduler;
    }

    pub fn policy_settings(&self) -> PolicySettings {
        PolicySettings {
            sorting_merge_policy_enabled: self.sorting_merge_policy_enabled,
        }
    }

    pub fn writer_config(&self) -> IndexWriterConfig {
        IndexWriterConfig {
            max_buffered_docs: self.max_buffered_docs,
            scheduler: self.merge_scheduler,
        }
    }
}

/// Replica recovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Give up on a recovery after this many seconds
    #[serde(default = "default_recovery_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

impl RecoveryConfig {
    fn merge(&mut self, other: Self) {
        if other.timeout_secs > 0 {
            self.timeout_secs = other.timeout_secs;
        }
    }

    /// Get recovery timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    fn merge(&mut self, other: Self) {
        if !other.level.is_empty() {
            self.level = other.level;
        }
    }

    /// Install a global fmt subscriber at this level. Returns false if one
    /// was already installed.
    pub fn init(&self) -> bool {
        let filter = tracing_subscriber::EnvFilter::try_new(&self.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_log_level()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    }
}

// Default value functions

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_port() -> u16 {
    8983
}

fn default_context() -> String {
    "search".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_sorting_merge_policy_enabled() -> bool {
    true
}

fn default_recovery_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
}
