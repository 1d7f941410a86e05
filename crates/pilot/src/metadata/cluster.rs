//! Cluster state
//!
//! Collections -> slices -> replicas, plus the live-node set. The state is
//! mutated only by applying `ClusterEvent`s; every applied event bumps the
//! version so watchers can tell that something changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use tc_core::SlotRange;

use super::{Collection, NodeName, Replica, ReplicaState, Slice};

/// A change published by the coordination service
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterEvent {
    NodeJoined(NodeName),
    NodeLeft(NodeName),
    CollectionCreated {
        name: String,
        config_set: String,
        replication_factor: usize,
        slices: Vec<(String, SlotRange)>,
        properties: HashMap<String, String>,
    },
    CollectionDeleted(String),
    /// The first replica added to a slice becomes its leader
    ReplicaAdded {
        collection: String,
        slice: String,
        replica: Replica,
    },
    ReplicaRemoved {
        collection: String,
        slice: String,
        replica: String,
    },
    ReplicaStateChanged {
        collection: String,
        slice: String,
        replica: String,
        state: ReplicaState,
    },
    LeaderChanged {
        collection: String,
        slice: String,
        replica: String,
    },
}

/// Snapshot of the whole cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterState {
    /// Bumped once per applied event
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub live_nodes: BTreeSet<NodeName>,
    pub collections: BTreeMap<String, Collection>,
}

impl Default for ClusterState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterState {
    pub fn new() -> Self {
        Self {
            version: 0,
            updated_at: Utc::now(),
            live_nodes: BTreeSet::new(),
            collections: BTreeMap::new(),
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Apply an event. Returns false (and leaves the version alone) when the
    /// event refers to something that does not exist or changes nothing.
    pub fn apply(&mut self, event: ClusterEvent) -> bool {
        let changed = match event {
            ClusterEvent::NodeJoined(node) => self.live_nodes.insert(node),
            ClusterEvent::NodeLeft(node) => self.live_nodes.remove(&node),
            ClusterEvent::CollectionCreated {
                name,
                config_set,
                replication_factor,
                slices,
                properties,
            } => {
                if self.collections.contains_key(&name) {
                    false
                } else {
                    let collection = Collection {
                        name: name.clone(),
                        config_set,
                        replication_factor,
                        slices: slices
                            .into_iter()
                            .map(|(slice, range)| Slice::new(slice, range))
                            .collect(),
                        properties,
                    };
                    self.collections.insert(name, collection);
                    true
                }
            }
            ClusterEvent::CollectionDeleted(name) => self.collections.remove(&name).is_some(),
            ClusterEvent::ReplicaAdded {
                collection,
                slice,
                mut replica,
            } => match self.slice_mut(&collection, &slice) {
                Some(s) if !s.replicas.contains_key(&replica.name) => {
                    replica.leader = s.replicas.is_empty();
                    s.replicas.insert(replica.name.clone(), replica);
                    true
                }
                _ => false,
            },
            ClusterEvent::ReplicaRemoved {
                collection,
                slice,
                replica,
            } => match self.slice_mut(&collection, &slice) {
                Some(s) => match s.replicas.remove(&replica) {
                    Some(removed) => {
                        if removed.leader {
                            s.elect_leader();
                        }
                        true
                    }
                    None => false,
                },
                None => false,
            },
            ClusterEvent::ReplicaStateChanged {
                collection,
                slice,
                replica,
                state,
            } => match self.slice_mut(&collection, &slice) {
                Some(s) => match s.replicas.get_mut(&replica) {
                    Some(r) if r.state != state => {
                        r.state = state;
                        s.elect_leader();
                        true
                    }
                    _ => false,
                },
                None => false,
            },
            ClusterEvent::LeaderChanged {
                collection,
                slice,
                replica,
            } => match self.slice_mut(&collection, &slice) {
                Some(s) => {
                    let already = s.leader().is_some_and(|r| r.name == replica);
                    !already && s.set_leader(&replica)
                }
                None => false,
            },
        };
        if changed {
            self.touch();
            debug!("Cluster state advanced to version {}", self.version);
        }
        changed
    }

    fn slice_mut(&mut self, collection: &str, slice: &str) -> Option<&mut Slice> {
        self.collections.get_mut(collection)?.slice_mut(slice)
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn is_live(&self, node: &str) -> bool {
        self.live_nodes.contains(node)
    }

    /// Replica count of a collection; zero when it does not exist
    pub fn replica_count(&self, collection: &str) -> usize {
        self.collection(collection).map_or(0, |c| c.replica_count())
    }

    /// True once a collection is gone or has no replicas left
    pub fn is_collection_empty(&self, collection: &str) -> bool {
        self.replica_count(collection) == 0
    }

    /// Every replica hosted by `node`, as (collection, slice, replica)
    pub fn replicas_on(&self, node: &str) -> Vec<(String, String, Replica)> {
        self.collections
            .values()
            .flat_map(|c| {
                c.replicas()
                    .filter(move |(_, r)| r.node == node)
                    .map(move |(s, r)| (c.name.clone(), s.name.clone(), r.clone()))
            })
            .collect()
    }

    /// Number of replicas per node, for placement
    pub fn core_counts(&self) -> HashMap<NodeName, usize> {
        let mut counts = HashMap::new();
        for collection in self.collections.values() {
            for (_, replica) in collection.replicas() {
                *counts.entry(replica.node.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Replicas of `collection` hosted on live nodes but not yet active
    pub fn recovering_count(&self, collection: &str) -> usize {
        self.collection(collection).map_or(0, |c| {
            c.replicas()
                .filter(|(_, r)| self.is_live(&r.node) && !r.is_active())
                .count()
        })
    }

    /// Events that rebuild this state's collections in a fresh one.
    ///
    /// Live nodes are not carried over and every replica comes back `Down`
    /// until its node rejoins. Leaders are added first so they lead again.
    pub fn restore_events(&self) -> Vec<ClusterEvent> {
        let mut events = Vec::new();
        for collection in self.collections.values() {
            events.push(ClusterEvent::CollectionCreated {
                name: collection.name.clone(),
                config_set: collection.config_set.clone(),
                replication_factor: collection.replication_factor,
                slices: collection
                    .slices
                    .iter()
                    .map(|s| (s.name.clone(), s.range))
                    .collect(),
                properties: collection.properties.clone(),
            });
            for slice in &collection.slices {
                let mut replicas: Vec<&Replica> = slice.replicas.values().collect();
                replicas.sort_by_key(|r| !r.leader);
                for replica in replicas {
                    events.push(ClusterEvent::ReplicaAdded {
                        collection: collection.name.clone(),
                        slice: slice.name.clone(),
                        replica: Replica {
                            state: ReplicaState::Down,
                            leader: false,
                            ..replica.clone()
                        },
                    });
                }
            }
        }
        events
    }

    /// Check that every non-empty slice has exactly one leader
    pub fn leaders_consistent(&self) -> bool {
        self.collections.values().all(|c| {
            c.slices.iter().all(|s| {
                let leaders = s.replicas.values().filter(|r| r.leader).count();
                if s.replicas.is_empty() {
                    leaders == 0
                } else {
                    leaders == 1
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(state: &mut ClusterState, name: &str, shards: u32) {
        let slices = SlotRange::partition(shards)
            .into_iter()
            .enumerate()
            .map(|(i, r)| (format!("shard{}", i + 1), r))
            .collect();
        assert!(state.apply(ClusterEvent::CollectionCreated {
            name: name.to_string(),
            config_set: "conf".to_string(),
            replication_factor: 2,
            slices,
            properties: HashMap::new(),
        }));
    }

    fn add(state: &mut ClusterState, slice: &str, replica: &str, node: &str) {
        assert!(state.apply(ClusterEvent::ReplicaAdded {
            collection: "c".to_string(),
            slice: slice.to_string(),
            replica: Replica {
                name: replica.to_string(),
                node: node.to_string(),
                core: format!("c_{}_{}", slice, replica),
                state: ReplicaState::Active,
                leader: false,
            },
        }));
    }

    #[test]
    fn test_first_replica_leads() {
        let mut state = ClusterState::new();
        create(&mut state, "c", 2);
        add(&mut state, "shard1", "core_node1", "n1");
        add(&mut state, "shard1", "core_node2", "n2");

        let slice = state.collection("c").unwrap().slice("shard1").unwrap();
        assert_eq!(slice.leader().unwrap().name, "core_node1");
        assert!(state.leaders_consistent());
        assert_eq!(state.replica_count("c"), 2);
        assert_eq!(state.replicas_on("n2").len(), 1);
    }

    #[test]
    fn test_leader_moves_when_it_goes_down() {
        let mut state = ClusterState::new();
        create(&mut state, "c", 1);
        add(&mut state, "shard1", "core_node1", "n1");
        add(&mut state, "shard1", "core_node2", "n2");

        state.apply(ClusterEvent::ReplicaStateChanged {
            collection: "c".into(),
            slice: "shard1".into(),
            replica: "core_node1".into(),
            state: ReplicaState::Down,
        });
        let slice = state.collection("c").unwrap().slice("shard1").unwrap();
        assert_eq!(slice.leader().unwrap().name, "core_node2");
        assert!(state.leaders_consistent());

        state.apply(ClusterEvent::ReplicaRemoved {
            collection: "c".into(),
            slice: "shard1".into(),
            replica: "core_node2".into(),
        });
        let slice = state.collection("c").unwrap().slice("shard1").unwrap();
        assert_eq!(slice.leader().unwrap().name, "core_node1");
    }

    #[test]
    fn test_version_bumps_only_on_change() {
        let mut state = ClusterState::new();
        assert!(state.apply(ClusterEvent::NodeJoined("n1".into())));
        assert!(!state.apply(ClusterEvent::NodeJoined("n1".into())));
        assert_eq!(state.version, 1);

        create(&mut state, "c", 1);
        assert!(!state.apply(ClusterEvent::LeaderChanged {
            collection: "c".into(),
            slice: "shard1".into(),
            replica: "missing".into(),
        }));
        assert_eq!(state.version, 2);
    }

    #[test]
    fn test_restore_events_rebuild_collections() {
        let mut state = ClusterState::new();
        state.apply(ClusterEvent::NodeJoined("n1".into()));
        create(&mut state, "c", 2);
        add(&mut state, "shard1", "core_node1", "n1");
        add(&mut state, "shard1", "core_node2", "n2");
        add(&mut state, "shard2", "core_node3", "n1");
        state.apply(ClusterEvent::LeaderChanged {
            collection: "c".into(),
            slice: "shard1".into(),
            replica: "core_node2".into(),
        });

        let mut restored = ClusterState::new();
        for event in state.restore_events() {
            assert!(restored.apply(event));
        }
        assert!(restored.live_nodes.is_empty());
        let collection = restored.collection("c").unwrap();
        assert_eq!(collection.shard_count(), 2);
        assert_eq!(collection.replica_count(), 3);
        assert_eq!(
            collection.slices[0].range,
            state.collection("c").unwrap().slices[0].range
        );
        let shard1 = collection.slice("shard1").unwrap();
        assert_eq!(shard1.leader().unwrap().name, "core_node2");
        assert!(collection
            .replicas()
            .all(|(_, r)| r.state == ReplicaState::Down));
        assert!(restored.leaders_consistent());
    }

    #[test]
    fn test_deleted_collection_is_empty() {
        let mut state = ClusterState::new();
        create(&mut state, "c", 1);
        add(&mut state, "shard1", "core_node1", "n1");
        assert!(!state.is_collection_empty("c"));

        assert!(state.apply(ClusterEvent::CollectionDeleted("c".into())));
        assert!(state.is_collection_empty("c"));
        assert!(state.collection("c").is_none());
    }
}
