//! Cluster orchestrator
//!
//! Owns the node processes of a cluster and drives collection admin through
//! the coordination service. Node lifecycle per tracked node:
//! `Stopped -> Starting -> Running -> Stopping -> Stopped`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use node::{ConfigSet, CoreDescriptor, NodeError, NodeLauncher, SearchNode};
use tc_core::SlotRange;

use crate::async_ops::{AsyncOperations, AsyncState};
use crate::client::CloudClient;
use crate::config::ClusterConfig;
use crate::coordinator::Coordinator;
use crate::error::ClusterError;
use crate::metadata::{ClusterEvent, ClusterState, NodeName, Replica, ReplicaState};
use crate::placement::PlacementStrategy;
use crate::storage::FileStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLifecycle {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// A node tracked by the orchestrator
#[derive(Clone)]
pub struct ClusterNode {
    index: usize,
    state: NodeLifecycle,
    handle: Arc<SearchNode>,
}

impl std::fmt::Debug for ClusterNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterNode")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("name", &self.handle.name())
            .finish()
    }
}

impl ClusterNode {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn base_url(&self) -> &str {
        self.handle.base_url()
    }

    pub fn port(&self) -> u16 {
        self.handle.port()
    }

    pub fn state(&self) -> NodeLifecycle {
        self.state
    }

    pub fn handle(&self) -> &Arc<SearchNode> {
        &self.handle
    }
}

/// Which nodes a new collection may use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSet {
    /// Every live node
    Any,
    /// No nodes at all: the collection is created without replicas
    Empty,
    Nodes(Vec<NodeName>),
}

/// Collection creation request
#[derive(Debug, Clone)]
pub struct CreateCollection {
    pub name: String,
    pub config_set: String,
    pub num_shards: usize,
    pub replication_factor: usize,
    pub node_set: NodeSet,
    pub properties: HashMap<String, String>,
    /// Run in the background and report through the async tracker
    pub async_id: Option<String>,
}

impl CreateCollection {
    pub fn new(
        name: impl Into<String>,
        config_set: impl Into<String>,
        num_shards: usize,
        replication_factor: usize,
    ) -> Self {
        Self {
            name: name.into(),
            config_set: config_set.into(),
            num_shards,
            replication_factor,
            node_set: NodeSet::Any,
            properties: HashMap::new(),
            async_id: None,
        }
    }

    pub fn with_node_set(mut self, node_set: NodeSet) -> Self {
        self.node_set = node_set;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_async_id(mut self, id: impl Into<String>) -> Self {
        self.async_id = Some(id.into());
        self
    }

    fn expected_replicas(&self) -> usize {
        match self.node_set {
            NodeSet::Empty => 0,
            _ => self.num_shards * self.replication_factor,
        }
    }
}

struct Inner {
    config: ClusterConfig,
    launcher: Arc<dyn NodeLauncher>,
    coordinator: Arc<Coordinator>,
    nodes: Mutex<Vec<ClusterNode>>,
    async_ops: AsyncOperations,
    placement: PlacementStrategy,
    storage: Option<FileStorage>,
}

pub struct ClusterOrchestrator {
    inner: Arc<Inner>,
}

impl ClusterOrchestrator {
    /// Start the coordination service and `node_count` nodes.
    ///
    /// State saved by an earlier shutdown in the data directory is restored
    /// first, and each node recovers its replicas as it joins. Every start
    /// and join is attempted. If any fails, the nodes that did start are
    /// stopped again, the coordination service is shut down and the failures
    /// are returned together, in start order.
    pub async fn bring_up(
        node_count: usize,
        config: ClusterConfig,
        launcher: Arc<dyn NodeLauncher>,
    ) -> Result<Self, ClusterError> {
        let coordinator = Coordinator::start(config.coordinator_address.clone());
        let storage = config.data_dir.as_ref().map(FileStorage::new);
        if let Some(storage) = &storage {
            if let Err(e) = restore_state(&coordinator, storage).await {
                warn!("Failed to restore cluster state: {}", e);
                coordinator.shutdown();
                return Err(e);
            }
        }
        info!("Starting cluster of {} nodes", node_count);

        let mut tasks = Vec::with_capacity(node_count);
        for index in 0..node_count {
            let launcher = launcher.clone();
            let node_config = config.node.clone();
            let port = node_port(&config, index);
            tasks.push(tokio::spawn(async move {
                launcher.start(index, &node_config, port).await
            }));
        }

        let mut started = Vec::with_capacity(node_count);
        let mut causes = Vec::new();
        for (index, task) in tasks.into_iter().enumerate() {
            match task.await {
                Ok(Ok(handle)) => started.push(ClusterNode {
                    index,
                    state: NodeLifecycle::Running,
                    handle,
                }),
                Ok(Err(e)) => {
                    warn!("Node {} failed to start: {}", index, e);
                    causes.push(e);
                }
                Err(e) => {
                    warn!("Start task for node {} died: {}", index, e);
                    causes.push(NodeError::Task(e.to_string()));
                }
            }
        }

        let inner = Arc::new(Inner {
            config,
            launcher,
            coordinator,
            nodes: Mutex::new(Vec::new()),
            async_ops: AsyncOperations::new(),
            placement: PlacementStrategy::default(),
            storage,
        });
        if causes.is_empty() {
            for node in &started {
                if let Err(e) = inner.join(&node.handle).await {
                    warn!("Node {} failed to join: {}", node.name(), e);
                    causes.push(join_failure(node.name(), e));
                }
            }
        }

        if !causes.is_empty() {
            for node in &started {
                if let Err(e) = inner.launcher.stop(&node.handle).await {
                    warn!("Failed to stop {} during rollback: {}", node.name(), e);
                }
            }
            inner.coordinator.shutdown();
            return Err(ClusterError::StartupFailed { causes });
        }

        info!("Cluster started with {} nodes", started.len());
        *inner.nodes.lock().await = started;
        Ok(Self { inner })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.inner.config
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.inner.coordinator
    }

    pub fn client(&self) -> CloudClient {
        CloudClient::new(self.inner.coordinator.clone())
    }

    pub async fn cluster_state(&self) -> ClusterState {
        self.inner.coordinator.state().await
    }

    pub fn upload_config_set(&self, config_set: ConfigSet) {
        self.inner.coordinator.upload_config_set(config_set);
    }

    /// Tracked nodes in start order
    pub async fn nodes(&self) -> Vec<ClusterNode> {
        self.inner.nodes.lock().await.clone()
    }

    pub async fn running_nodes(&self) -> Vec<ClusterNode> {
        self.inner
            .nodes
            .lock()
            .await
            .iter()
            .filter(|n| n.state == NodeLifecycle::Running)
            .cloned()
            .collect()
    }

    /// Start a node. `None` adds a new node; `Some(name)` restarts a
    /// stopped one, which then recovers its replicas.
    pub async fn start_node(&self, name: Option<&str>) -> Result<ClusterNode, ClusterError> {
        let inner = &self.inner;
        let mut nodes = inner.nodes.lock().await;

        let position = match name {
            Some(name) => {
                let position = nodes
                    .iter()
                    .position(|n| n.name() == name)
                    .ok_or_else(|| ClusterError::NodeNotFound(name.to_string()))?;
                let node = &mut nodes[position];
                if node.state != NodeLifecycle::Stopped {
                    return Err(NodeError::AlreadyRunning(name.to_string()).into());
                }
                node.state = NodeLifecycle::Starting;
                if let Err(e) = inner.launcher.restart(&node.handle).await {
                    warn!("Failed to restart {}: {}", name, e);
                    node.state = NodeLifecycle::Stopped;
                    return Err(e.into());
                }
                position
            }
            None => {
                let index = nodes.len();
                let handle = inner
                    .launcher
                    .start(index, &inner.config.node, node_port(&inner.config, index))
                    .await?;
                nodes.push(ClusterNode {
                    index,
                    state: NodeLifecycle::Starting,
                    handle,
                });
                index
            }
        };

        let handle = nodes[position].handle.clone();
        if let Err(e) = inner.join(&handle).await {
            warn!("Node {} failed to join: {}", handle.name(), e);
            if let Err(stop) = inner.launcher.stop(&handle).await {
                warn!("Failed to stop {} after a failed join: {}", handle.name(), stop);
            }
            if let Err(down) = inner.mark_down(handle.name()).await {
                warn!("Failed to mark {} down: {}", handle.name(), down);
            }
            nodes[position].state = NodeLifecycle::Stopped;
            return Err(e);
        }
        nodes[position].state = NodeLifecycle::Running;
        info!("Node {} is running", handle.name());
        Ok(nodes[position].clone())
    }

    /// Stop a running node and return it, ready for `start_node`. Its
    /// replicas go down; the node ends up stopped even when the stop reports
    /// an error.
    pub async fn stop_node(&self, name: &str) -> Result<ClusterNode, ClusterError> {
        let inner = &self.inner;
        let mut nodes = inner.nodes.lock().await;
        let node = nodes
            .iter_mut()
            .find(|n| n.name() == name)
            .ok_or_else(|| ClusterError::NodeNotFound(name.to_string()))?;
        if node.state != NodeLifecycle::Running {
            return Err(NodeError::NotRunning(name.to_string()).into());
        }

        node.state = NodeLifecycle::Stopping;
        let stopped = inner.launcher.stop(&node.handle).await;
        node.state = NodeLifecycle::Stopped;
        inner.mark_down(name).await?;
        stopped?;
        info!("Node {} stopped", name);
        Ok(node.clone())
    }

    /// Create a collection. Without an async id this waits until every
    /// replica is active; with one it returns at once.
    pub async fn create_collection(&self, request: CreateCollection) -> Result<(), ClusterError> {
        match request.async_id.clone() {
            None => self.inner.create_collection(request).await,
            Some(id) => {
                self.inner.async_ops.register(&id)?;
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    let outcome = inner
                        .create_collection(request)
                        .await
                        .map_err(|e| e.to_string());
                    inner.async_ops.finish(&id, outcome);
                });
                Ok(())
            }
        }
    }

    /// Status of an async admin request, waiting up to `timeout`
    pub async fn async_status(&self, id: &str, timeout: Duration) -> Result<AsyncState, ClusterError> {
        self.inner.async_ops.get_status(id, timeout).await
    }

    /// Remove a collection and its cores
    pub async fn delete_collection(&self, name: &str) -> Result<(), ClusterError> {
        self.inner.delete_collection(name).await
    }

    pub async fn wait_for_collection_to_disappear(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<(), ClusterError> {
        self.inner
            .coordinator
            .wait_for(
                &format!("collection {} to disappear", name),
                timeout,
                self.inner.config.poll_interval(),
                |s| s.is_collection_empty(name),
            )
            .await
    }

    /// Wait until no replica of `collection` on a live node is recovering
    pub async fn wait_for_recoveries(&self, collection: &str, timeout: Duration) -> Result<(), ClusterError> {
        self.inner
            .coordinator
            .wait_for(
                &format!("recoveries in {}", collection),
                timeout,
                self.inner.config.poll_interval(),
                |s| s.collection(collection).is_some() && s.recovering_count(collection) == 0,
            )
            .await
    }

    /// Stop every running node, then the coordination service.
    ///
    /// All stops are attempted; failures are returned together. No node is
    /// left running afterwards.
    pub async fn shutdown(&self) -> Result<(), ClusterError> {
        let inner = &self.inner;
        let mut nodes = inner.nodes.lock().await;
        info!("Shutting down cluster");

        let mut tasks = Vec::new();
        for (position, node) in nodes.iter_mut().enumerate() {
            if node.state != NodeLifecycle::Running {
                continue;
            }
            node.state = NodeLifecycle::Stopping;
            let launcher = inner.launcher.clone();
            let handle = node.handle.clone();
            tasks.push((
                position,
                tokio::spawn(async move { launcher.stop(&handle).await }),
            ));
        }

        let mut causes = Vec::new();
        for (position, task) in tasks {
            let node = &mut nodes[position];
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Node {} failed to stop cleanly: {}", node.name(), e);
                    causes.push(e);
                }
                Err(e) => {
                    warn!("Stop task for {} died: {}", node.name(), e);
                    causes.push(NodeError::Task(e.to_string()));
                }
            }
            if inner.launcher.is_running(&node.handle) {
                if let Err(e) = node.handle.stop().await {
                    warn!("Forced stop of {} failed: {}", node.name(), e);
                }
            }
            node.state = NodeLifecycle::Stopped;
            if let Err(e) = inner.mark_down(node.handle.name()).await {
                warn!("Failed to mark {} down: {}", node.name(), e);
            }
        }

        if let Some(storage) = &inner.storage {
            let state = inner.coordinator.state().await;
            if let Err(e) = storage.save(&state).await {
                warn!("Failed to save cluster state: {}", e);
            }
        }
        inner.coordinator.shutdown();

        if causes.is_empty() {
            info!("Cluster shut down");
            Ok(())
        } else {
            Err(ClusterError::ShutdownFailed { causes })
        }
    }
}

impl Inner {
    /// Unload every replica core of `name`, then drop it from the state
    async fn delete_collection(&self, name: &str) -> Result<(), ClusterError> {
        let collection = self
            .coordinator
            .read(|s| s.collection(name).cloned())
            .await
            .ok_or_else(|| ClusterError::CollectionNotFound(name.to_string()))?;

        for (slice, replica) in collection.replicas() {
            match self.coordinator.node(&replica.node) {
                Some(handle) => match handle.unload_core(&replica.core).await {
                    Ok(()) | Err(NodeError::CoreNotFound(_)) => {}
                    Err(e) => warn!("Failed to unload {} from {}: {}", replica.core, replica.node, e),
                },
                None => warn!(
                    "Node {} is down, core {} is removed when it rejoins",
                    replica.node, replica.core
                ),
            }
            self.coordinator
                .apply(ClusterEvent::ReplicaRemoved {
                    collection: name.to_string(),
                    slice: slice.name.clone(),
                    replica: replica.name.clone(),
                })
                .await?;
        }
        self.coordinator
            .apply(ClusterEvent::CollectionDeleted(name.to_string()))
            .await?;
        info!("Deleted collection {}", name);
        Ok(())
    }

    async fn create_collection(&self, request: CreateCollection) -> Result<(), ClusterError> {
        let name = request.name.clone();
        let config_set = self
            .coordinator
            .config_set(&request.config_set)
            .ok_or_else(|| ClusterError::ConfigSetNotFound(request.config_set.clone()))?;
        let state = self.coordinator.state().await;
        if state.collection(&name).is_some() {
            return Err(ClusterError::CollectionExists(name));
        }

        let candidates: Vec<NodeName> = match &request.node_set {
            NodeSet::Empty => Vec::new(),
            NodeSet::Any => state.live_nodes.iter().cloned().collect(),
            NodeSet::Nodes(nodes) => {
                if let Some(missing) = nodes.iter().find(|n| !state.is_live(n)) {
                    return Err(ClusterError::NodeNotFound(missing.clone()));
                }
                nodes.clone()
            }
        };
        let expected = request.expected_replicas();
        if expected > 0 && candidates.is_empty() {
            return Err(ClusterError::NotEnoughNodes {
                requested: expected,
                available: 0,
            });
        }

        let slice_names: Vec<String> = (1..=request.num_shards).map(|i| format!("shard{}", i)).collect();
        let created = self
            .coordinator
            .apply(ClusterEvent::CollectionCreated {
                name: name.clone(),
                config_set: request.config_set.clone(),
                replication_factor: request.replication_factor,
                slices: slice_names
                    .iter()
                    .cloned()
                    .zip(SlotRange::partition(request.num_shards as u32))
                    .collect(),
                properties: request.properties.clone(),
            })
            .await?;
        if !created {
            return Err(ClusterError::CollectionExists(name));
        }
        info!(
            "Created collection {} ({} shards x {} replicas)",
            name, request.num_shards, request.replication_factor
        );

        let populated = self
            .populate(&request, &slice_names, &candidates, &state, &config_set)
            .await;
        if let Err(e) = populated {
            warn!("Creating collection {} failed, removing it: {}", name, e);
            if let Err(cleanup) = self.delete_collection(&name).await {
                warn!("Failed to remove partial collection {}: {}", name, cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Place and create the replicas of a new collection, then wait until
    /// all of them are active
    async fn populate(
        &self,
        request: &CreateCollection,
        slice_names: &[String],
        candidates: &[NodeName],
        state: &ClusterState,
        config_set: &ConfigSet,
    ) -> Result<(), ClusterError> {
        let name = &request.name;
        let expected = request.expected_replicas();
        let plan = if expected == 0 {
            Vec::new()
        } else {
            self.placement.assign(
                slice_names,
                request.replication_factor,
                candidates,
                &state.core_counts(),
            )
        };
        for (n, assignment) in plan.into_iter().enumerate() {
            let replica = Replica {
                name: format!("core_node{}", n + 1),
                node: assignment.node,
                core: format!("{}_{}_replica_n{}", name, assignment.slice, n + 1),
                state: ReplicaState::Recovering,
                leader: false,
            };
            self.add_replica(request, &assignment.slice, replica, config_set)
                .await?;
        }

        self.coordinator
            .wait_for(
                &format!("collection {} to become active", name),
                self.config.wait_timeout(),
                self.config.poll_interval(),
                |s| s.replica_count(name) == expected && s.recovering_count(name) == 0,
            )
            .await
    }

    async fn add_replica(
        &self,
        request: &CreateCollection,
        slice: &str,
        replica: Replica,
        config_set: &ConfigSet,
    ) -> Result<(), ClusterError> {
        let handle = self
            .coordinator
            .node(&replica.node)
            .ok_or_else(|| ClusterError::NodeNotFound(replica.node.clone()))?;
        self.coordinator
            .apply(ClusterEvent::ReplicaAdded {
                collection: request.name.clone(),
                slice: slice.to_string(),
                replica: replica.clone(),
            })
            .await?;

        let descriptor = CoreDescriptor {
            name: replica.core.clone(),
            collection: request.name.clone(),
            shard: slice.to_string(),
            replica: replica.name.clone(),
            config_set: config_set.name.clone(),
            properties: request.properties.clone(),
        };
        if let Err(e) = handle.create_core(descriptor, config_set.clone()).await {
            // the core under this name is not ours to unload
            self.coordinator
                .apply(ClusterEvent::ReplicaRemoved {
                    collection: request.name.clone(),
                    slice: slice.to_string(),
                    replica: replica.name.clone(),
                })
                .await?;
            return Err(e.into());
        }
        self.set_state(&request.name, slice, &replica.name, ReplicaState::Active)
            .await
    }

    async fn set_state(
        &self,
        collection: &str,
        slice: &str,
        replica: &str,
        state: ReplicaState,
    ) -> Result<(), ClusterError> {
        self.coordinator
            .apply(ClusterEvent::ReplicaStateChanged {
                collection: collection.to_string(),
                slice: slice.to_string(),
                replica: replica.to_string(),
                state,
            })
            .await?;
        Ok(())
    }

    /// Mark every replica on `node` down and drop it from the live set
    async fn mark_down(&self, node: &str) -> Result<(), ClusterError> {
        let hosted = self.coordinator.read(|s| s.replicas_on(node)).await;
        let events = hosted
            .into_iter()
            .map(|(collection, slice, replica)| ClusterEvent::ReplicaStateChanged {
                collection,
                slice,
                replica: replica.name,
                state: ReplicaState::Down,
            })
            .collect();
        self.coordinator.apply_all(events).await?;
        self.coordinator.unregister_node(node).await
    }

    /// Register a started node, confirm it through the launcher and recover
    /// its replicas
    async fn join(&self, handle: &Arc<SearchNode>) -> Result<(), ClusterError> {
        self.coordinator.register_node(handle.clone()).await?;
        self.launcher.joined(handle).await?;
        self.recover_replicas(handle).await
    }

    /// Bring the replicas of a rejoined node back to active.
    ///
    /// Cores of deleted collections are unloaded. A replica copies the
    /// leader's segments when another active leader exists and otherwise
    /// keeps its own data.
    async fn recover_replicas(&self, handle: &SearchNode) -> Result<(), ClusterError> {
        let state = self.coordinator.state().await;
        let hosted = state.replicas_on(handle.name());

        let known: HashSet<&str> = hosted.iter().map(|(_, _, r)| r.core.as_str()).collect();
        for core in handle.core_names() {
            if !known.contains(core.as_str()) {
                info!("Unloading orphaned core {} from {}", core, handle.name());
                handle.unload_core(&core).await?;
            }
        }

        for (collection, slice, replica) in &hosted {
            self.set_state(collection, slice, &replica.name, ReplicaState::Recovering)
                .await?;
            if handle.core(&replica.core).is_err() {
                match self.recreate_core(handle, collection, slice, replica).await {
                    Ok(()) => {}
                    Err(ClusterError::ConfigSetNotFound(config_set)) => {
                        warn!(
                            "Config set {} not uploaded, {} stays down",
                            config_set, replica.core
                        );
                        self.set_state(collection, slice, &replica.name, ReplicaState::Down)
                            .await?;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            let leader = self
                .coordinator
                .read(|s| {
                    s.collection(collection)
                        .and_then(|c| c.slice(slice))
                        .and_then(|s| s.leader())
                        .filter(|l| l.is_active() && l.name != replica.name)
                        .cloned()
                })
                .await;
            if let Some(leader) = leader {
                if let Some(leader_node) = self.coordinator.node(&leader.node) {
                    let snapshot = leader_node.snapshot(&leader.core)?;
                    handle.recover(&replica.core, &snapshot).await?;
                }
            }
            self.set_state(collection, slice, &replica.name, ReplicaState::Active)
                .await?;
        }
        Ok(())
    }

    async fn recreate_core(
        &self,
        handle: &SearchNode,
        collection: &str,
        slice: &str,
        replica: &Replica,
    ) -> Result<(), ClusterError> {
        let Some((config_set, properties)) = self
            .coordinator
            .read(|s| {
                s.collection(collection)
                    .map(|c| (c.config_set.clone(), c.properties.clone()))
            })
            .await
        else {
            return Err(ClusterError::CollectionNotFound(collection.to_string()));
        };
        let config_set = self
            .coordinator
            .config_set(&config_set)
            .ok_or(ClusterError::ConfigSetNotFound(config_set))?;
        warn!(
            "Core {} missing on {}, recreating it",
            replica.core,
            handle.name()
        );
        let descriptor = CoreDescriptor {
            name: replica.core.clone(),
            collection: collection.to_string(),
            shard: slice.to_string(),
            replica: replica.name.clone(),
            config_set: config_set.name.clone(),
            properties,
        };
        handle.create_core(descriptor, config_set).await?;
        Ok(())
    }
}

/// Replay state saved by an earlier shutdown, if there is any
async fn restore_state(coordinator: &Coordinator, storage: &FileStorage) -> Result<(), ClusterError> {
    let Some(saved) = storage.load().await? else {
        return Ok(());
    };
    info!(
        "Restoring {} collections from {:?}",
        saved.collections.len(),
        storage.state_path()
    );
    coordinator.apply_all(saved.restore_events()).await?;
    Ok(())
}

/// Cause recorded when a started node fails to join
fn join_failure(node: &str, error: ClusterError) -> NodeError {
    match error {
        ClusterError::Node(e) => e,
        other => NodeError::Join {
            node: node.to_string(),
            reason: other.to_string(),
        },
    }
}

fn node_port(config: &ClusterConfig, index: usize) -> u16 {
    let offset = u16::try_from(index).unwrap_or(u16::MAX);
    config.node.node.base_port.saturating_add(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_failure_keeps_node_errors() {
        let fault = NodeError::Fault("refused".to_string());
        assert_eq!(
            join_failure("n1", ClusterError::Node(fault.clone())),
            fault
        );

        let stopped = join_failure("n1", ClusterError::CoordinatorStopped("127.0.0.1:9983".into()));
        assert_eq!(
            stopped.to_string(),
            "Node n1 failed to join the cluster: Coordination service at 127.0.0.1:9983 is not running"
        );
    }

    #[test]
    fn test_node_port_saturates() {
        let config = ClusterConfig::default();
        let base = config.node.node.base_port;
        assert_eq!(node_port(&config, 2), base + 2);
        assert_eq!(node_port(&config, usize::MAX), u16::MAX);
    }
}
