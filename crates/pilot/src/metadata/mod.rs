//! Cluster state definitions
//!
//! Collections, their slices and replicas, and the events that change them

mod cluster;
mod collection;

pub use cluster::{ClusterEvent, ClusterState};
pub use collection::{Collection, NodeName, Replica, ReplicaState, Slice};
