//! Collection, slice and replica definitions

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use tc_core::SlotRange;

/// Node name, e.g. `127.0.0.1:8983_search`
pub type NodeName = String;

/// Replica state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaState {
    /// Serving updates and queries
    Active,
    /// Catching up from the slice leader
    Recovering,
    /// Hosting node is stopped
    Down,
}

impl Default for ReplicaState {
    fn default() -> Self {
        Self::Recovering
    }
}

impl std::fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplicaState::Active => write!(f, "active"),
            ReplicaState::Recovering => write!(f, "recovering"),
            ReplicaState::Down => write!(f, "down"),
        }
    }
}

/// One copy of a slice, backed by a core on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replica {
    /// Replica name, e.g. `core_node3`
    pub name: String,
    pub node: NodeName,
    /// Core hosting this replica on `node`
    pub core: String,
    pub state: ReplicaState,
    pub leader: bool,
}

impl Replica {
    pub fn is_active(&self) -> bool {
        self.state == ReplicaState::Active
    }
}

/// Slice (shard) of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub name: String,
    pub range: SlotRange,
    /// replica name -> replica
    pub replicas: BTreeMap<String, Replica>,
}

impl Slice {
    pub fn new(name: impl Into<String>, range: SlotRange) -> Self {
        Self {
            name: name.into(),
            range,
            replicas: BTreeMap::new(),
        }
    }

    pub fn leader(&self) -> Option<&Replica> {
        self.replicas.values().find(|r| r.leader)
    }

    pub fn active_replicas(&self) -> impl Iterator<Item = &Replica> {
        self.replicas.values().filter(|r| r.is_active())
    }

    /// Move the leader flag to `replica`
    pub(crate) fn set_leader(&mut self, replica: &str) -> bool {
        if !self.replicas.contains_key(replica) {
            return false;
        }
        for r in self.replicas.values_mut() {
            r.leader = r.name == replica;
        }
        true
    }

    /// Pick a new leader if the current one is missing or not active.
    ///
    /// Prefers an active replica; a slice whose replicas are all down keeps
    /// its current leader.
    pub(crate) fn elect_leader(&mut self) -> Option<String> {
        let current = self.leader().map(|r| (r.name.clone(), r.is_active()));
        if let Some((name, true)) = &current {
            return Some(name.clone());
        }
        let candidate = self
            .active_replicas()
            .next()
            .map(|r| r.name.clone())
            .or_else(|| match &current {
                Some((name, _)) => Some(name.clone()),
                None => self.replicas.keys().next().cloned(),
            })?;
        self.set_leader(&candidate);
        Some(candidate)
    }
}

/// Collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub config_set: String,
    pub replication_factor: usize,
    /// Slices in creation order
    pub slices: Vec<Slice>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Collection {
    pub fn shard_count(&self) -> usize {
        self.slices.len()
    }

    pub fn slice(&self, name: &str) -> Option<&Slice> {
        self.slices.iter().find(|s| s.name == name)
    }

    pub(crate) fn slice_mut(&mut self, name: &str) -> Option<&mut Slice> {
        self.slices.iter_mut().find(|s| s.name == name)
    }

    /// Slice owning the hash slot of `key`
    pub fn slice_for_key(&self, key: &str) -> Option<&Slice> {
        let slot = tc_core::slot_for_key(key.as_bytes());
        self.slices.iter().find(|s| s.range.contains(slot))
    }

    pub fn replicas(&self) -> impl Iterator<Item = (&Slice, &Replica)> {
        self.slices
            .iter()
            .flat_map(|s| s.replicas.values().map(move |r| (s, r)))
    }

    pub fn replica_count(&self) -> usize {
        self.slices.iter().map(|s| s.replicas.len()).sum()
    }

    /// Zero replicas; a deleted or coreless collection
    pub fn is_empty(&self) -> bool {
        self.replica_count() == 0
    }

    pub fn leaders(&self) -> Vec<&Replica> {
        self.slices.iter().filter_map(|s| s.leader()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replica(name: &str, state: ReplicaState, leader: bool) -> Replica {
        Replica {
            name: name.to_string(),
            node: "n".to_string(),
            core: format!("c_{}", name),
            state,
            leader,
        }
    }

    #[test]
    fn test_elect_prefers_active_replica() {
        let mut slice = Slice::new("shard1", SlotRange::new(0, 100));
        slice
            .replicas
            .insert("a".into(), replica("a", ReplicaState::Down, true));
        slice
            .replicas
            .insert("b".into(), replica("b", ReplicaState::Active, false));

        assert_eq!(slice.elect_leader().as_deref(), Some("b"));
        assert_eq!(slice.leader().map(|r| r.name.as_str()), Some("b"));
        assert_eq!(slice.replicas.values().filter(|r| r.leader).count(), 1);
    }

    #[test]
    fn test_all_down_keeps_leader() {
        let mut slice = Slice::new("shard1", SlotRange::new(0, 100));
        slice
            .replicas
            .insert("a".into(), replica("a", ReplicaState::Down, false));
        slice
            .replicas
            .insert("b".into(), replica("b", ReplicaState::Down, true));
        assert_eq!(slice.elect_leader().as_deref(), Some("b"));
    }

    #[test]
    fn test_slice_for_key_uses_slot_ranges() {
        let collection = Collection {
            name: "c".into(),
            config_set: "conf".into(),
            replication_factor: 1,
            slices: SlotRange::partition(2)
                .into_iter()
                .enumerate()
                .map(|(i, r)| Slice::new(format!("shard{}", i + 1), r))
                .collect(),
            properties: HashMap::new(),
        };
        let slot = tc_core::slot_for_key(b"doc-1");
        let slice = collection.slice_for_key("doc-1").unwrap();
        assert!(slice.range.contains(slot));
        assert!(collection.is_empty());
    }
}
