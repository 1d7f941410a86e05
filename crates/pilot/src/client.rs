//! Cluster-aware client
//!
//! Routes updates to slice leaders by hash slot and fans queries out to one
//! active replica per slice.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use node::SearchNode;
use search::{SearchRequest, SearchResponse, ShardResponse, ShardResponseMerger};
use tc_core::Document;

use crate::coordinator::Coordinator;
use crate::error::ClusterError;
use crate::metadata::{Collection, Replica, Slice};

#[derive(Clone)]
pub struct CloudClient {
    coordinator: Arc<Coordinator>,
}

impl CloudClient {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    async fn collection(&self, name: &str) -> Result<Collection, ClusterError> {
        self.coordinator
            .read(|s| s.collection(name).cloned())
            .await
            .ok_or_else(|| ClusterError::CollectionNotFound(name.to_string()))
    }

    fn node_for(&self, collection: &str, slice: &Slice, replica: &Replica) -> Result<Arc<SearchNode>, ClusterError> {
        self.coordinator
            .node(&replica.node)
            .ok_or_else(|| ClusterError::NoActiveReplica {
                collection: collection.to_string(),
                slice: slice.name.clone(),
            })
    }

    /// Index documents. Each goes to its slice leader and every other active
    /// replica of that slice.
    pub async fn add(&self, collection: &str, docs: Vec<Document>) -> Result<(), ClusterError> {
        let state = self.collection(collection).await?;
        let mut batches: BTreeMap<&str, Vec<Document>> = BTreeMap::new();
        for doc in docs {
            let slice = state
                .slice_for_key(&doc.id)
                .ok_or_else(|| ClusterError::NoActiveReplica {
                    collection: collection.to_string(),
                    slice: format!("slot of {}", doc.id),
                })?;
            batches.entry(slice.name.as_str()).or_default().push(doc);
        }

        for (name, docs) in batches {
            let Some(slice) = state.slice(name) else {
                continue;
            };
            let leader = slice
                .leader()
                .filter(|l| l.is_active())
                .ok_or_else(|| ClusterError::NoActiveReplica {
                    collection: collection.to_string(),
                    slice: name.to_string(),
                })?;
            debug!("Routing {} docs to {} leader {}", docs.len(), name, leader.core);
            self.node_for(collection, slice, leader)?
                .add(&leader.core, docs.clone())?;
            for replica in slice.active_replicas().filter(|r| !r.leader) {
                self.node_for(collection, slice, replica)?
                    .add(&replica.core, docs.clone())?;
            }
        }
        Ok(())
    }

    /// Commit every active replica
    pub async fn commit(&self, collection: &str) -> Result<(), ClusterError> {
        let state = self.collection(collection).await?;
        for (slice, replica) in state.replicas().filter(|(_, r)| r.is_active()) {
            self.node_for(collection, slice, replica)?
                .commit(&replica.core)
                .await?;
        }
        Ok(())
    }

    /// Force-merge every active replica down to `max_segments`
    pub async fn optimize(&self, collection: &str, max_segments: usize) -> Result<(), ClusterError> {
        let state = self.collection(collection).await?;
        for (slice, replica) in state.replicas().filter(|(_, r)| r.is_active()) {
            self.node_for(collection, slice, replica)?
                .optimize(&replica.core, max_segments)
                .await?;
        }
        Ok(())
    }

    /// Search every slice in parallel and merge the results. A slice with
    /// no reachable active replica contributes a failed shard response.
    pub async fn query(&self, collection: &str, request: &SearchRequest) -> Result<SearchResponse, ClusterError> {
        let state = self.collection(collection).await?;
        let shard_query = request.shard_query();

        let mut responses = Vec::with_capacity(state.slices.len());
        let mut tasks = Vec::with_capacity(state.slices.len());
        for slice in &state.slices {
            let target = slice
                .leader()
                .filter(|l| l.is_active())
                .or_else(|| slice.active_replicas().next());
            let Some(replica) = target else {
                responses.push(ShardResponse::failed(&slice.name, "", "no active replica"));
                continue;
            };
            let Some(node) = self.coordinator.node(&replica.node) else {
                responses.push(ShardResponse::failed(
                    &slice.name,
                    &replica.core,
                    format!("node {} unreachable", replica.node),
                ));
                continue;
            };

            let query = shard_query.clone();
            let shard = slice.name.clone();
            let core = replica.core.clone();
            let task = tokio::task::spawn_blocking(move || match node.search(&core, &query) {
                Ok(result) => ShardResponse::ok(shard, core, result),
                Err(e) => ShardResponse::failed(shard, core, e.to_string()),
            });
            tasks.push((slice.name.clone(), replica.core.clone(), task));
        }

        for (shard, core, task) in tasks {
            match task.await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    warn!("Search task for {} died: {}", shard, e);
                    responses.push(ShardResponse::failed(shard, core, e.to_string()));
                }
            }
        }
        Ok(ShardResponseMerger::new(request).merge(responses))
    }
}
