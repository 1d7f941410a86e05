//! Shared harness for cluster integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use index::PolicyArgs;
use node::{Config, ConfigSet, LocalLauncher, NodeError, NodeLauncher, SearchNode};
use pilot::{ClusterConfig, ClusterOrchestrator, CreateCollection};
use tc_core::{Document, FieldType, IndexSchema};

pub const CONFIG_SET: &str = "conf";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Launcher that remembers every node it started
pub struct RecordingLauncher {
    inner: LocalLauncher,
    started: Mutex<Vec<Arc<SearchNode>>>,
}

impl RecordingLauncher {
    pub fn new(inner: LocalLauncher) -> Arc<Self> {
        Arc::new(Self {
            inner,
            started: Mutex::new(Vec::new()),
        })
    }

    pub fn started(&self) -> Vec<Arc<SearchNode>> {
        self.started.lock().clone()
    }

    pub fn running_count(&self) -> usize {
        self.started.lock().iter().filter(|n| n.is_running()).count()
    }
}

#[async_trait]
impl NodeLauncher for RecordingLauncher {
    async fn start(
        &self,
        index: usize,
        config: &Config,
        port: u16,
    ) -> Result<Arc<SearchNode>, NodeError> {
        let node = self.inner.start(index, config, port).await?;
        self.started.lock().push(node.clone());
        Ok(node)
    }

    async fn stop(&self, node: &SearchNode) -> Result<(), NodeError> {
        self.inner.stop(node).await
    }

    async fn restart(&self, node: &SearchNode) -> Result<(), NodeError> {
        self.inner.restart(node).await
    }

    async fn joined(&self, node: &SearchNode) -> Result<(), NodeError> {
        self.inner.joined(node).await
    }
}

pub fn cluster_config(dir: &Path) -> ClusterConfig {
    let mut config = ClusterConfig::with_base_dir(dir);
    config.wait_timeout_secs = 30;
    config
}

/// Sorted on `timestamp desc`, wrapping the tiered policy
pub fn sorted_config_set() -> ConfigSet {
    ConfigSet::new(
        CONFIG_SET,
        IndexSchema::default().with_field("timestamp", FieldType::Long),
        PolicyArgs::new()
            .with("class", "SortingMergePolicyFactory")
            .with("wrapped.prefix", "in")
            .with("in.class", "TieredMergePolicyFactory")
            .with("sort", "timestamp desc"),
    )
}

pub async fn start_cluster(nodes: usize, dir: &Path) -> ClusterOrchestrator {
    start_cluster_with(nodes, dir, RecordingLauncher::new(LocalLauncher::new())).await
}

pub async fn start_cluster_with(
    nodes: usize,
    dir: &Path,
    launcher: Arc<RecordingLauncher>,
) -> ClusterOrchestrator {
    init_logging();
    let cluster = ClusterOrchestrator::bring_up(nodes, cluster_config(dir), launcher)
        .await
        .unwrap();
    cluster.upload_config_set(sorted_config_set());
    cluster
}

pub async fn create(cluster: &ClusterOrchestrator, name: &str, shards: usize, replicas: usize) {
    cluster
        .create_collection(CreateCollection::new(name, CONFIG_SET, shards, replicas))
        .await
        .unwrap();
}

/// Documents `first..first + count` with parity and quad group fields
pub fn docs(first: i64, count: i64, timestamp: impl Fn(i64) -> i64) -> Vec<Document> {
    (first..first + count)
        .map(|n| {
            Document::new(n.to_string())
                .with_field("timestamp", timestamp(n))
                .with_field("odd_l1", n % 2)
                .with_field("quad_l1", n % 4)
        })
        .collect()
}
