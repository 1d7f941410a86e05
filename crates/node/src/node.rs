//! Search node implementation
//!
//! Hosts the cores (replica-local indexes) placed on it and serves updates
//! and per-shard queries against them. Committed core state lives under the
//! node's data directory and survives a stop/start cycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::fs;
use tracing::{info, warn};

use index::{SegmentSet, ShardQuery, ShardResult};
use tc_core::Document;

use crate::config::Config;
use crate::config_set::ConfigSet;
use crate::cores::{Core, CoreDescriptor};
use crate::error::NodeError;

/// Search node
pub struct SearchNode {
    /// Node name, e.g. `127.0.0.1:8983_search`
    name: String,
    base_url: String,
    port: u16,
    data_dir: PathBuf,
    /// core name -> core
    cores: RwLock<HashMap<String, Arc<Core>>>,
    running: AtomicBool,
    config: Config,
}

impl SearchNode {
    pub fn new(config: Config, port: u16) -> Self {
        let name = config.node.node_name(port);
        let data_dir = config
            .node
            .data_dir
            .join(name.replace(|c: char| c == ':' || c == '/', "_"));
        Self {
            base_url: config.node.base_url(port),
            name,
            port,
            data_dir,
            cores: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
            config,
        }
    }

    /// Get node name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start node: reopen every core found in the data directory
    pub async fn start(&self) -> Result<(), NodeError> {
        if self.is_running() {
            return Err(NodeError::AlreadyRunning(self.name.clone()));
        }
        info!("Starting search node: {}", self.name);
        fs::create_dir_all(&self.data_dir).await?;

        let mut loaded = HashMap::new();
        let mut entries = fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match Core::load(entry.path(), &self.config.index).await {
                Ok(core) => {
                    loaded.insert(core.name().to_string(), Arc::new(core));
                }
                Err(NodeError::Io(e)) => {
                    warn!("Skipping {:?} on {}: {}", entry.path(), self.name, e);
                }
                Err(e) => return Err(e),
            }
        }

        let count = loaded.len();
        *self.cores.write() = loaded;
        self.running.store(true, Ordering::SeqCst);
        info!("Search node started: {} ({} cores)", self.name, count);
        Ok(())
    }

    /// Stop node. Cores are closed; committed state stays on disk.
    pub async fn stop(&self) -> Result<(), NodeError> {
        info!("Stopping search node: {}", self.name);
        self.running.store(false, Ordering::SeqCst);
        let cores: Vec<Arc<Core>> = self.cores.write().drain().map(|(_, c)| c).collect();

        let mut first_error = None;
        for core in cores {
            if let Err(e) = core.close() {
                warn!("Failed to close core {} on {}: {}", core.name(), self.name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn ensure_running(&self) -> Result<(), NodeError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(NodeError::NotRunning(self.name.clone()))
        }
    }

    pub fn core(&self, name: &str) -> Result<Arc<Core>, NodeError> {
        self.ensure_running()?;
        self.cores
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| NodeError::CoreNotFound(name.to_string()))
    }

    /// Names of the hosted cores, sorted
    pub fn core_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cores.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn cores(&self) -> Vec<Arc<Core>> {
        self.cores.read().values().cloned().collect()
    }

    /// Create and persist an empty core
    pub async fn create_core(
        &self,
        descriptor: CoreDescriptor,
        config_set: ConfigSet,
    ) -> Result<Arc<Core>, NodeError> {
        self.ensure_running()?;
        if self.cores.read().contains_key(&descriptor.name) {
            return Err(NodeError::CoreExists(descriptor.name));
        }
        let dir = self.data_dir.join(&descriptor.name);
        let core = Arc::new(Core::open(descriptor, config_set, &self.config.index, dir)?);
        core.persist().await?;

        let mut cores = self.cores.write();
        if cores.contains_key(core.name()) {
            return Err(NodeError::CoreExists(core.name().to_string()));
        }
        cores.insert(core.name().to_string(), core.clone());
        info!("Created core {} on {}", core.name(), self.name);
        Ok(core)
    }

    /// Unload a core and delete its data
    pub async fn unload_core(&self, name: &str) -> Result<(), NodeError> {
        self.ensure_running()?;
        let core = self
            .cores
            .write()
            .remove(name)
            .ok_or_else(|| NodeError::CoreNotFound(name.to_string()))?;
        core.close()?;
        if fs::try_exists(core.dir()).await? {
            fs::remove_dir_all(core.dir()).await?;
        }
        info!("Unloaded core {} from {}", name, self.name);
        Ok(())
    }

    pub fn add(&self, core: &str, docs: Vec<Document>) -> Result<(), NodeError> {
        let core = self.core(core)?;
        for doc in docs {
            core.add(doc)?;
        }
        Ok(())
    }

    /// Commit and persist
    pub async fn commit(&self, core: &str) -> Result<(), NodeError> {
        let core = self.core(core)?;
        core.commit()?;
        core.persist().await
    }

    /// Force-merge down to `max_segments` and persist
    pub async fn optimize(&self, core: &str, max_segments: usize) -> Result<(), NodeError> {
        let core = self.core(core)?;
        core.optimize(max_segments)?;
        core.persist().await
    }

    pub fn search(&self, core: &str, query: &ShardQuery) -> Result<ShardResult, NodeError> {
        Ok(self.core(core)?.search(query))
    }

    pub fn snapshot(&self, core: &str) -> Result<SegmentSet, NodeError> {
        Ok(self.core(core)?.snapshot())
    }

    /// Replace a core's segments with a copy of the leader's
    pub async fn recover(&self, core: &str, leader: &SegmentSet) -> Result<(), NodeError> {
        let core = self.core(core)?;
        core.replicate_from(leader)?;
        core.persist().await?;
        info!(
            "Recovered core {} on {} ({} docs)",
            core.name(),
            self.name,
            core.num_docs()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::PolicyArgs;
    use tc_core::{FieldType, IndexSchema, Query, SortKey};

    fn node(dir: &Path) -> SearchNode {
        let mut config = Config::default();
        config.node.data_dir = dir.to_path_buf();
        SearchNode::new(config, 8983)
    }

    fn config_set() -> ConfigSet {
        ConfigSet::new(
            "conf",
            IndexSchema::default().with_field("timestamp", FieldType::Long),
            PolicyArgs::new()
                .with("class", "SortingMergePolicyFactory")
                .with("sort", "timestamp desc"),
        )
    }

    fn descriptor(name: &str) -> CoreDescriptor {
        CoreDescriptor {
            name: name.to_string(),
            collection: "c".to_string(),
            shard: "shard1".to_string(),
            replica: "core_node1".to_string(),
            config_set: "conf".to_string(),
            properties: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_core_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let node = node(dir.path());
        node.start().await.unwrap();
        node.create_core(descriptor("c_shard1_replica_n1"), config_set())
            .await
            .unwrap();

        let docs = (0..5)
            .map(|n| Document::new(n.to_string()).with_field("timestamp", n as i64))
            .collect();
        node.add("c_shard1_replica_n1", docs).unwrap();
        node.commit("c_shard1_replica_n1").await.unwrap();
        node.stop().await.unwrap();
        assert!(!node.is_running());
        assert!(matches!(
            node.core("c_shard1_replica_n1"),
            Err(NodeError::NotRunning(_))
        ));

        node.start().await.unwrap();
        assert_eq!(node.core_names(), vec!["c_shard1_replica_n1"]);
        let query = ShardQuery::new(Query::All, SortKey::parse("timestamp desc").unwrap(), 1);
        let result = node.search("c_shard1_replica_n1", &query).unwrap();
        assert_eq!(result.num_found, 5);
        assert_eq!(result.hits[0].doc.id, "4");
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_cores() {
        let dir = tempfile::tempdir().unwrap();
        let node = node(dir.path());
        node.start().await.unwrap();
        node.create_core(descriptor("a"), config_set()).await.unwrap();
        assert!(matches!(
            node.create_core(descriptor("a"), config_set()).await,
            Err(NodeError::CoreExists(_))
        ));

        node.unload_core("a").await.unwrap();
        assert!(matches!(node.core("a"), Err(NodeError::CoreNotFound(_))));
        assert!(!dir.path().join("127.0.0.1_8983_search").join("a").exists());
    }

    #[tokio::test]
    async fn test_recover_copies_leader_segments() {
        let dir = tempfile::tempdir().unwrap();
        let node = node(dir.path());
        node.start().await.unwrap();
        node.create_core(descriptor("leader"), config_set()).await.unwrap();
        node.create_core(descriptor("replica"), config_set()).await.unwrap();

        node.add("leader", vec![Document::new("x").with_field("timestamp", 1i64)])
            .unwrap();
        node.commit("leader").await.unwrap();
        let snapshot = node.snapshot("leader").unwrap();
        node.recover("replica", &snapshot).await.unwrap();
        assert_eq!(node.core("replica").unwrap().num_docs(), 1);
    }
}
