use index::{IndexError, PolicyError};
use thiserror::Error;

/// Search node error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("Node {0} is not running")]
    NotRunning(String),
    #[error("Node {0} is already running")]
    AlreadyRunning(String),
    #[error("Core {0} already exists")]
    CoreExists(String),
    #[error("No such core: {0}")]
    CoreNotFound(String),
    #[error("Config set {0} not found")]
    ConfigSetNotFound(String),
    /// Raised by a fault-injection hook
    #[error("{0}")]
    Fault(String),
    #[error("Data directory error: {0}")]
    Io(String),
    /// Registration with the coordination service failed
    #[error("Node {node} failed to join the cluster: {reason}")]
    Join { node: String, reason: String },
    /// A start or stop task died before reporting
    #[error("Node task failed: {0}")]
    Task(String),
    #[error("Corrupt core data: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl From<std::io::Error> for NodeError {
    fn from(e: std::io::Error) -> Self {
        NodeError::Io(e.to_string())
    }
}
