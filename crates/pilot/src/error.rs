use std::time::Duration;

use node::NodeError;
use thiserror::Error;

use crate::storage::StorageError;

/// Control plane error
#[derive(Debug, Error)]
pub enum ClusterError {
    /// One cause per node that failed to start, in start-attempt order
    #[error("Error starting up cluster")]
    StartupFailed { causes: Vec<NodeError> },
    /// One cause per node that failed to stop
    #[error("Error shutting down cluster")]
    ShutdownFailed { causes: Vec<NodeError> },
    #[error("Timed out after {timeout:?} waiting for {what}")]
    RequestTimeout { what: String, timeout: Duration },
    #[error("Collection {0} already exists")]
    CollectionExists(String),
    #[error("Collection {0} not found")]
    CollectionNotFound(String),
    #[error("Config set {0} not found")]
    ConfigSetNotFound(String),
    #[error("Not enough live nodes: {requested} requested, {available} available")]
    NotEnoughNodes { requested: usize, available: usize },
    #[error("Node {0} is not part of the cluster")]
    NodeNotFound(String),
    #[error("No active replica for {collection}/{slice}")]
    NoActiveReplica { collection: String, slice: String },
    #[error("Async request id {0} already in use")]
    AsyncIdExists(String),
    #[error("No async request with id {0}")]
    AsyncNotFound(String),
    #[error("Coordination service at {0} is not running")]
    CoordinatorStopped(String),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClusterError {
    /// Per-node causes of an aggregate startup or shutdown failure
    pub fn causes(&self) -> &[NodeError] {
        match self {
            ClusterError::StartupFailed { causes } | ClusterError::ShutdownFailed { causes } => {
                causes
            }
            _ => &[],
        }
    }
}
