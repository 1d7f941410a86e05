//! Replica-local index core

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use index::{
    EarlyTerminationCollector, IndexWriter, Segment, SegmentSet, ShardQuery, ShardResult,
};
use tc_core::{Document, IndexSchema};

use crate::config::IndexConfig;
use crate::config_set::ConfigSet;
use crate::error::NodeError;

const CORE_FILE: &str = "core.json";

/// Identity of one core: which replica of which slice it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreDescriptor {
    /// Core name, unique per node
    pub name: String,
    pub collection: String,
    pub shard: String,
    /// Replica name in cluster state
    pub replica: String,
    pub config_set: String,
    /// Collection properties, substituted into merge-policy args
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// On-disk form of a core's committed state
#[derive(Serialize, Deserialize)]
struct PersistedCore {
    descriptor: CoreDescriptor,
    config_set: ConfigSet,
    segments: Vec<Segment>,
}

pub struct Core {
    descriptor: CoreDescriptor,
    config_set: ConfigSet,
    schema: Arc<IndexSchema>,
    writer: IndexWriter,
    dir: PathBuf,
}

impl Core {
    /// Open an empty core
    pub fn open(
        descriptor: CoreDescriptor,
        config_set: ConfigSet,
        config: &IndexConfig,
        dir: PathBuf,
    ) -> Result<Self, NodeError> {
        let policy =
            config_set.merge_policy(&config.policy_settings(), &descriptor.properties)?;
        let schema = Arc::new(config_set.schema.clone());
        let writer = IndexWriter::new(schema.clone(), policy, config.writer_config());
        info!(
            "Opened core {} ({}/{}) with merge policy {}",
            descriptor.name,
            descriptor.collection,
            descriptor.shard,
            writer.merge_policy().name()
        );
        Ok(Self {
            descriptor,
            config_set,
            schema,
            writer,
            dir,
        })
    }

    /// Reopen a core from its data directory
    pub async fn load(dir: PathBuf, config: &IndexConfig) -> Result<Self, NodeError> {
        let content = fs::read_to_string(dir.join(CORE_FILE)).await?;
        let persisted: PersistedCore =
            serde_json::from_str(&content).map_err(|e| NodeError::Corrupt(e.to_string()))?;
        let core = Self::open(persisted.descriptor, persisted.config_set, config, dir)?;
        let segments: SegmentSet = Arc::new(persisted.segments.into_iter().map(Arc::new).collect());
        core.writer.replicate_from(&segments)?;
        debug!("Loaded core {} with {} docs", core.name(), core.num_docs());
        Ok(core)
    }

    /// Write the committed segment set to the data directory
    pub async fn persist(&self) -> Result<(), NodeError> {
        fs::create_dir_all(&self.dir).await?;
        let persisted = PersistedCore {
            descriptor: self.descriptor.clone(),
            config_set: self.config_set.clone(),
            segments: self.writer.snapshot().iter().map(|s| s.as_ref().clone()).collect(),
        };
        let content =
            serde_json::to_string(&persisted).map_err(|e| NodeError::Corrupt(e.to_string()))?;

        // Write to temp file first, then atomically rename
        let path = self.dir.join(CORE_FILE);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    pub fn descriptor(&self) -> &CoreDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn schema(&self) -> &Arc<IndexSchema> {
        &self.schema
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn writer(&self) -> &IndexWriter {
        &self.writer
    }

    pub fn add(&self, doc: Document) -> Result<(), NodeError> {
        Ok(self.writer.add_document(doc)?)
    }

    pub fn commit(&self) -> Result<(), NodeError> {
        Ok(self.writer.commit()?)
    }

    pub fn optimize(&self, max_segments: usize) -> Result<(), NodeError> {
        Ok(self.writer.force_merge(max_segments)?)
    }

    pub fn snapshot(&self) -> SegmentSet {
        self.writer.snapshot()
    }

    pub fn num_docs(&self) -> usize {
        self.writer.num_docs()
    }

    pub fn replicate_from(&self, source: &SegmentSet) -> Result<(), NodeError> {
        Ok(self.writer.replicate_from(source)?)
    }

    /// Collect over a consistent point-in-time segment set
    pub fn search(&self, query: &ShardQuery) -> ShardResult {
        let snapshot = self.writer.snapshot();
        EarlyTerminationCollector::new(query, self.schema.unique_key.clone()).search(&snapshot)
    }

    pub fn close(&self) -> Result<(), NodeError> {
        Ok(self.writer.close()?)
    }
}
