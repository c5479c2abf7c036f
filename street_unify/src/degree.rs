use std::collections::BTreeMap;

use anyhow::Result;

use streetutil::Counter;

use crate::dataset::DataSet;
use crate::types::{FeatureID, NodeID, WayID};

/// For every node, how often each street-graph way touches it. This is a derived index: rebuild
/// it after any phase that restructures ways, and drop it when unification is done.
pub struct NodeDegrees {
    per_node: BTreeMap<NodeID, Counter<WayID>>,
}

impl NodeDegrees {
    /// Fails if a member way references a node that doesn't exist.
    pub fn build(ds: &DataSet, streetgraph: FeatureID) -> Result<NodeDegrees> {
        let mut per_node: BTreeMap<NodeID, Counter<WayID>> = BTreeMap::new();
        for way in ds.ways.values() {
            if !way.is_member_of(streetgraph) {
                continue;
            }
            for node in &way.nodes {
                if !ds.nodes.contains_key(node) {
                    bail!("{} referenced by {} not found", node, way.id);
                }
                per_node
                    .entry(*node)
                    .or_insert_with(Counter::new)
                    .inc(way.id);
            }
        }
        Ok(NodeDegrees { per_node })
    }

    /// Number of distinct ways touching the node
    pub fn size(&self, node: NodeID) -> usize {
        self.per_node.get(&node).map(|c| c.len()).unwrap_or(0)
    }

    /// Number of touches, so a way passing through a node twice counts twice
    pub fn count(&self, node: NodeID) -> usize {
        self.per_node.get(&node).map(|c| c.sum()).unwrap_or(0)
    }

    pub fn count_of(&self, node: NodeID, way: WayID) -> usize {
        self.per_node.get(&node).map(|c| c.get(&way)).unwrap_or(0)
    }

    /// Distinct ways touching the node, in ID order.
    pub fn ways(&self, node: NodeID) -> Vec<WayID> {
        self.per_node
            .get(&node)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_else(Vec::new)
    }

    /// Every node touched by at least one way.
    pub fn nodes(&self) -> Vec<NodeID> {
        self.per_node.keys().cloned().collect()
    }

    pub fn add(&mut self, node: NodeID, way: WayID) {
        self.per_node
            .entry(node)
            .or_insert_with(Counter::new)
            .inc(way);
    }

    pub fn remove_all(&mut self, node: NodeID, way: WayID) {
        let now_empty = match self.per_node.get_mut(&node) {
            Some(c) => {
                c.remove_all(&way);
                c.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.per_node.remove(&node);
        }
    }

    /// Forgets a way at every node in the list.
    pub fn remove_way(&mut self, nodes: &[NodeID], way: WayID) {
        for node in nodes {
            self.remove_all(*node, way);
        }
    }
}
