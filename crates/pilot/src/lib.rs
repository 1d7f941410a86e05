//! Pilot - cluster control plane
//!
//! Brings search nodes up and down and drives collection admin through a
//! coordination service.
//!
//! # Features
//! - Cluster state: collections, slices, replicas and leaders
//! - Node lifecycle with aggregated startup and shutdown failures
//! - Collection create/delete, synchronous or tracked as async requests
//! - Cloud client: slot-routed updates, fan-out/fan-in queries
//!
//! # Usage Example
//! ```ignore
//! use pilot::{ClusterConfig, ClusterOrchestrator, CreateCollection};
//!
//! let cluster = ClusterOrchestrator::bring_up(3, ClusterConfig::default(), launcher).await?;
//! cluster.upload_config_set(config_set);
//! cluster.create_collection(CreateCollection::new("events", "conf", 2, 1)).await?;
//! cluster.shutdown().await?;
//! ```

pub mod async_ops;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod placement;
pub mod storage;

pub use async_ops::{AsyncOperation, AsyncOperations, AsyncState};
pub use client::CloudClient;
pub use config::ClusterConfig;
pub use coordinator::Coordinator;
pub use error::ClusterError;
pub use metadata::{ClusterEvent, ClusterState, Collection, NodeName, Replica, ReplicaState, Slice};
pub use orchestrator::{ClusterNode, ClusterOrchestrator, CreateCollection, NodeLifecycle, NodeSet};
pub use placement::{Assignment, PlacementStrategy};
pub use storage::{FileStorage, StorageError};
