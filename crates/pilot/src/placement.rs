//! Replica placement strategy

use std::collections::{HashMap, HashSet};

use crate::metadata::NodeName;

/// One replica to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub slice: String,
    pub node: NodeName,
}

/// Placement strategy
#[derive(Debug, Clone)]
pub struct PlacementStrategy {
    /// Avoid two replicas of one slice on the same node when possible
    pub spread_replicas: bool,
}

impl Default for PlacementStrategy {
    fn default() -> Self {
        Self {
            spread_replicas: true,
        }
    }
}

impl PlacementStrategy {
    /// Assign `replication_factor` replicas of every slice to `nodes`.
    ///
    /// Works in rounds so that every slice gets its first replica (its
    /// leader) before any slice gets a second one. Each pick goes to the
    /// least-loaded candidate, ties broken by node name. `loads` holds the
    /// cores each node already hosts. Returns an empty plan when `nodes` is
    /// empty.
    pub fn assign(
        &self,
        slices: &[String],
        replication_factor: usize,
        nodes: &[NodeName],
        loads: &HashMap<NodeName, usize>,
    ) -> Vec<Assignment> {
        if nodes.is_empty() {
            return Vec::new();
        }

        let mut load: HashMap<&str, usize> = nodes
            .iter()
            .map(|n| (n.as_str(), loads.get(n).copied().unwrap_or(0)))
            .collect();
        let mut hosting: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut plan = Vec::with_capacity(slices.len() * replication_factor);

        for _ in 0..replication_factor {
            for slice in slices {
                let used = hosting.entry(slice.as_str()).or_default();
                let mut candidates: Vec<&str> = nodes
                    .iter()
                    .map(String::as_str)
                    .filter(|n| !self.spread_replicas || !used.contains(n))
                    .collect();
                if candidates.is_empty() {
                    candidates = nodes.iter().map(String::as_str).collect();
                }
                candidates.sort_by(|a, b| load[a].cmp(&load[b]).then_with(|| a.cmp(b)));

                let node = candidates[0];
                used.insert(node);
                if let Some(l) = load.get_mut(node) {
                    *l += 1;
                }
                plan.push(Assignment {
                    slice: slice.clone(),
                    node: node.to_string(),
                });
            }
        }
        plan
    }
}
