//! Coordination service
//!
//! Holds the authoritative `ClusterState`, the uploaded config sets and the
//! address book of live nodes. `apply` is the only path that mutates the
//! state; every applied change publishes the new version on a watch channel,
//! and readers re-read the state to observe it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use node::{ConfigSet, SearchNode};

use crate::error::ClusterError;
use crate::metadata::{ClusterEvent, ClusterState, NodeName};

pub struct Coordinator {
    address: String,
    state: RwLock<ClusterState>,
    /// Version of the last applied change
    version: watch::Sender<u64>,
    config_sets: parking_lot::RwLock<HashMap<String, ConfigSet>>,
    /// node name -> handle, for live nodes only
    nodes: parking_lot::RwLock<HashMap<NodeName, Arc<SearchNode>>>,
    running: AtomicBool,
}

impl Coordinator {
    pub fn start(address: impl Into<String>) -> Arc<Self> {
        let address = address.into();
        info!("Coordination service started at {}", address);
        Arc::new(Self {
            address,
            state: RwLock::new(ClusterState::new()),
            version: watch::Sender::new(0),
            config_sets: parking_lot::RwLock::new(HashMap::new()),
            nodes: parking_lot::RwLock::new(HashMap::new()),
            running: AtomicBool::new(true),
        })
    }

    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.nodes.write().clear();
            info!("Coordination service at {} shut down", self.address);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address handed to nodes at bootstrap
    pub fn address(&self) -> &str {
        &self.address
    }

    fn ensure_running(&self) -> Result<(), ClusterError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ClusterError::CoordinatorStopped(self.address.clone()))
        }
    }

    /// Apply an event to the cluster state and wake watchers
    pub async fn apply(&self, event: ClusterEvent) -> Result<bool, ClusterError> {
        self.apply_all(vec![event]).await
    }

    /// Apply events in order under one write lock
    pub async fn apply_all(&self, events: Vec<ClusterEvent>) -> Result<bool, ClusterError> {
        self.ensure_running()?;
        let version = {
            let mut state = self.state.write().await;
            let mut changed = false;
            for event in events {
                changed |= state.apply(event);
            }
            if !changed {
                return Ok(false);
            }
            state.version
        };
        debug!("Publishing cluster state version {}", version);
        self.version.send_replace(version);
        Ok(true)
    }

    /// Version of the last applied change
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Copy of the current state
    pub async fn state(&self) -> ClusterState {
        self.state.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&ClusterState) -> R) -> R {
        f(&*self.state.read().await)
    }

    /// Poll the state until `predicate` holds, waking early on change
    pub async fn wait_for<F>(
        &self,
        what: &str,
        timeout: Duration,
        poll_interval: Duration,
        predicate: F,
    ) -> Result<(), ClusterError>
    where
        F: Fn(&ClusterState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut versions = self.version.subscribe();
        loop {
            // mark the version seen before reading, so a change published
            // after the check still wakes the wait below
            versions.borrow_and_update();
            let done = predicate(&*self.state.read().await);
            if done {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("Timed out after {:?} waiting for {}", timeout, what);
                return Err(ClusterError::RequestTimeout {
                    what: what.to_string(),
                    timeout,
                });
            }
            let wait = poll_interval.min(deadline - now);
            if let Ok(Err(e)) = tokio::time::timeout(wait, versions.changed()).await {
                warn!("State watch for {} closed: {}", what, e);
                tokio::time::sleep(wait).await;
            }
        }
    }

    pub fn upload_config_set(&self, config_set: ConfigSet) {
        info!("Uploaded config set {}", config_set.name);
        self.config_sets
            .write()
            .insert(config_set.name.clone(), config_set);
    }

    pub fn config_set(&self, name: &str) -> Option<ConfigSet> {
        self.config_sets.read().get(name).cloned()
    }

    /// Add a started node to the address book and the live-node set
    pub async fn register_node(&self, node: Arc<SearchNode>) -> Result<(), ClusterError> {
        self.ensure_running()?;
        let name = node.name().to_string();
        self.nodes.write().insert(name.clone(), node);
        self.apply(ClusterEvent::NodeJoined(name.clone())).await?;
        info!("Node {} joined the cluster", name);
        Ok(())
    }

    pub async fn unregister_node(&self, name: &str) -> Result<(), ClusterError> {
        self.nodes.write().remove(name);
        if self.is_running() {
            self.apply(ClusterEvent::NodeLeft(name.to_string())).await?;
            info!("Node {} left the cluster", name);
        }
        Ok(())
    }

    /// Handle of a live node
    pub fn node(&self, name: &str) -> Option<Arc<SearchNode>> {
        self.nodes.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_wakes_on_apply() {
        let coordinator = Coordinator::start("127.0.0.1:9983");
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .wait_for("n1 to join", Duration::from_secs(5), Duration::from_secs(1), |s| {
                        s.is_live("n1")
                    })
                    .await
            })
        };
        coordinator
            .apply(ClusterEvent::NodeJoined("n1".to_string()))
            .await
            .unwrap();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_version_follows_applied_changes() {
        let coordinator = Coordinator::start("127.0.0.1:9983");
        let mut versions = coordinator.version.subscribe();
        assert_eq!(coordinator.version(), 0);

        coordinator
            .apply(ClusterEvent::NodeJoined("n1".to_string()))
            .await
            .unwrap();
        assert!(versions.has_changed().unwrap());
        assert_eq!(*versions.borrow_and_update(), 1);

        // no-op events publish nothing
        assert!(!coordinator
            .apply(ClusterEvent::NodeJoined("n1".to_string()))
            .await
            .unwrap());
        assert!(!versions.has_changed().unwrap());
        assert_eq!(coordinator.version(), coordinator.state().await.version);
    }

    #[tokio::test]
    async fn test_wait_for_sees_change_between_polls() {
        let coordinator = Coordinator::start("127.0.0.1:9983");
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .wait_for("n2 to join", Duration::from_secs(5), Duration::from_secs(30), |s| {
                        s.is_live("n2")
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        coordinator
            .apply(ClusterEvent::NodeJoined("n2".to_string()))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let coordinator = Coordinator::start("127.0.0.1:9983");
        let err = coordinator
            .wait_for("never", Duration::from_millis(50), Duration::from_millis(10), |_| false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::RequestTimeout { .. }));
    }

    #[tokio::test]
    async fn test_stopped_service_rejects_events() {
        let coordinator = Coordinator::start("127.0.0.1:9983");
        coordinator.shutdown();
        assert!(matches!(
            coordinator.apply(ClusterEvent::NodeJoined("n1".into())).await,
            Err(ClusterError::CoordinatorStopped(_))
        ));
    }
}
