//! Per-node process control
//!
//! `NodeLauncher` starts and stops search nodes. `LocalLauncher` runs them
//! in-process and consults an optional fault hook before each start, once a
//! node has joined the cluster, and after each stop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::NodeError;
use crate::node::SearchNode;

/// Where a fault hook is consulted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultPoint {
    /// Before the `index`-th node start of the orchestrator
    Start { index: usize, port: u16 },
    /// After a node registered with the coordination service
    Join { node: String },
    /// After a node was stopped
    Stop { node: String },
}

/// Returns an error to make the operation at that point fail
pub type FaultHook = Arc<dyn Fn(&FaultPoint) -> Result<(), NodeError> + Send + Sync>;

#[async_trait]
pub trait NodeLauncher: Send + Sync {
    /// Start a node listening on `port`; returns once it is running
    async fn start(
        &self,
        index: usize,
        config: &Config,
        port: u16,
    ) -> Result<Arc<SearchNode>, NodeError>;

    /// Stop a node; returns once it is stopped, even on error
    async fn stop(&self, node: &SearchNode) -> Result<(), NodeError>;

    /// Restart a stopped node in place, keeping its data
    async fn restart(&self, node: &SearchNode) -> Result<(), NodeError>;

    /// Confirm a node that registered with the coordination service is
    /// serving; an error fails its start
    async fn joined(&self, node: &SearchNode) -> Result<(), NodeError> {
        node.ensure_running()
    }

    fn is_running(&self, node: &SearchNode) -> bool {
        node.is_running()
    }
}

#[derive(Default)]
pub struct LocalLauncher {
    fault_hook: Option<FaultHook>,
}

impl LocalLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault_hook(hook: FaultHook) -> Self {
        Self {
            fault_hook: Some(hook),
        }
    }

    fn check(&self, point: &FaultPoint) -> Result<(), NodeError> {
        match &self.fault_hook {
            Some(hook) => hook(point),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NodeLauncher for LocalLauncher {
    async fn start(
        &self,
        index: usize,
        config: &Config,
        port: u16,
    ) -> Result<Arc<SearchNode>, NodeError> {
        self.check(&FaultPoint::Start { index, port })?;
        let node = Arc::new(SearchNode::new(config.clone(), port));
        node.start().await?;
        info!("Launched node {} at {}", node.name(), node.base_url());
        Ok(node)
    }

    async fn stop(&self, node: &SearchNode) -> Result<(), NodeError> {
        let stopped = node.stop().await;
        let fault = self.check(&FaultPoint::Stop {
            node: node.name().to_string(),
        });
        if let Err(e) = &fault {
            warn!("Stop of {} reported failure: {}", node.name(), e);
        }
        stopped.and(fault)
    }

    async fn restart(&self, node: &SearchNode) -> Result<(), NodeError> {
        node.start().await
    }

    async fn joined(&self, node: &SearchNode) -> Result<(), NodeError> {
        node.ensure_running()?;
        self.check(&FaultPoint::Join {
            node: node.name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.node.data_dir = dir.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_fault_hook_fails_chosen_start() {
        let dir = tempfile::tempdir().unwrap();
        let hook: FaultHook = Arc::new(|point: &FaultPoint| match point {
            FaultPoint::Start { index: 1, .. } => {
                Err(NodeError::Fault("Fake exception on startup!".to_string()))
            }
            _ => Ok(()),
        });
        let launcher = LocalLauncher::with_fault_hook(hook);

        let first = launcher.start(0, &config(dir.path()), 9000).await.unwrap();
        assert!(launcher.is_running(&first));
        let err = launcher.start(1, &config(dir.path()), 9001).await.err().unwrap();
        assert_eq!(err.to_string(), "Fake exception on startup!");
    }

    #[tokio::test]
    async fn test_stop_fault_still_stops_node() {
        let dir = tempfile::tempdir().unwrap();
        let hook: FaultHook = Arc::new(|point: &FaultPoint| match point {
            FaultPoint::Stop { .. } => Err(NodeError::Fault("Fake exception on shutdown!".to_string())),
            _ => Ok(()),
        });
        let launcher = LocalLauncher::with_fault_hook(hook);
        let node = launcher.start(0, &config(dir.path()), 9000).await.unwrap();

        assert!(launcher.stop(&node).await.is_err());
        assert!(!launcher.is_running(&node));
    }

    #[tokio::test]
    async fn test_join_fault_and_stopped_node() {
        let dir = tempfile::tempdir().unwrap();
        let hook: FaultHook = Arc::new(|point: &FaultPoint| match point {
            FaultPoint::Join { node } if node.contains(":9001_") => {
                Err(NodeError::Fault("never joined".to_string()))
            }
            _ => Ok(()),
        });
        let launcher = LocalLauncher::with_fault_hook(hook);
        let first = launcher.start(0, &config(dir.path()), 9000).await.unwrap();
        let second = launcher.start(1, &config(dir.path()), 9001).await.unwrap();

        launcher.joined(&first).await.unwrap();
        assert_eq!(
            launcher.joined(&second).await.unwrap_err().to_string(),
            "never joined"
        );

        launcher.stop(&first).await.unwrap();
        assert!(matches!(
            launcher.joined(&first).await,
            Err(NodeError::NotRunning(_))
        ));
    }
}
