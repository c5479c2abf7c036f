use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::graph_way::GraphWayComponent;
use crate::relation::RestrictionRelation;
use crate::types::{Node, NodeID, RelationID, Way, WayID};

/// Everything being unified. Ways refer to nodes and to each other only by ID.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub nodes: BTreeMap<NodeID, Node>,
    pub ways: BTreeMap<WayID, Way>,
    #[serde(default)]
    pub restrictions: BTreeMap<RelationID, RestrictionRelation>,
}

impl DataSet {
    pub fn new() -> DataSet {
        DataSet::default()
    }

    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn insert_way(&mut self, way: Way) {
        self.ways.insert(way.id, way);
    }

    pub fn insert_restriction(&mut self, r: RestrictionRelation) {
        self.restrictions.insert(r.id, r);
    }

    pub fn graph(&self, id: WayID) -> Option<&GraphWayComponent> {
        self.ways.get(&id).and_then(|w| w.graph.as_ref())
    }

    pub fn graph_mut(&mut self, id: WayID) -> Option<&mut GraphWayComponent> {
        self.ways.get_mut(&id).and_then(|w| w.graph.as_mut())
    }

    /// Every connector exactly once. U-turns live in one set only; the rest are counted from the
    /// outgoing side.
    pub fn connector_count(&self) -> usize {
        self.ways
            .values()
            .filter_map(|w| w.graph.as_ref())
            .map(|g| g.uturn.len() + g.outgoing.len())
            .sum()
    }
}

/// Hands out fresh way IDs whenever a way is split or re-identified.
pub trait WayIdGenerator {
    fn next(&mut self) -> WayID;
}

pub struct SequentialWayIds {
    next: i64,
}

impl SequentialWayIds {
    pub fn starting_at(next: i64) -> SequentialWayIds {
        SequentialWayIds { next }
    }

    /// Starts past every way ID currently used, so ways can be rewritten in place without
    /// collisions.
    pub fn after(dataset: &DataSet) -> SequentialWayIds {
        let next = dataset
            .ways
            .keys()
            .next_back()
            .map(|id| id.0 + 1)
            .unwrap_or(0);
        SequentialWayIds::starting_at(next.max(0))
    }
}

impl WayIdGenerator for SequentialWayIds {
    fn next(&mut self) -> WayID {
        let id = WayID(self.next);
        self.next += 1;
        id
    }
}

/// Verifies the mirrored storage of connectors: every outgoing connector is also incoming on its
/// target and the other way around, u-turns only sit at endpoints of their own way, and every via
/// node lies on both ways.
pub fn check_connector_symmetry(dataset: &DataSet) -> Result<()> {
    for way in dataset.ways.values() {
        let graph = match way.graph {
            Some(ref g) => g,
            None => continue,
        };

        for c in &graph.uturn {
            if c.from != way.id || c.to != way.id {
                bail!("{} holds a foreign u-turn {:?}", way.id, c);
            }
            if !way.is_endpoint(c.via) {
                bail!("{} has a u-turn at {}, which isn't an endpoint", way.id, c.via);
            }
        }

        for c in &graph.outgoing {
            if c.from != way.id || c.to == way.id {
                bail!("{} holds a misplaced outgoing {:?}", way.id, c);
            }
            let target = match dataset.ways.get(&c.to) {
                Some(w) => w,
                None => bail!("{} connects to {}, which doesn't exist", way.id, c.to),
            };
            if !way.contains_node(c.via) || !target.contains_node(c.via) {
                bail!("{:?} goes through a node not on both ways", c);
            }
            if !target
                .graph
                .as_ref()
                .map(|g| g.incoming.contains(c))
                .unwrap_or(false)
            {
                bail!("{:?} is outgoing on {}, but not incoming on {}", c, way.id, c.to);
            }
        }

        for c in &graph.incoming {
            if c.to != way.id || c.from == way.id {
                bail!("{} holds a misplaced incoming {:?}", way.id, c);
            }
            let source = match dataset.ways.get(&c.from) {
                Some(w) => w,
                None => bail!("{} is connected from {}, which doesn't exist", way.id, c.from),
            };
            if !source
                .graph
                .as_ref()
                .map(|g| g.outgoing.contains(c))
                .unwrap_or(false)
            {
                bail!("{:?} is incoming on {}, but not outgoing on {}", c, way.id, c.from);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Connector;
    use crate::types::LonLat;

    fn two_ways() -> DataSet {
        let mut ds = DataSet::new();
        for id in 1..=3 {
            ds.insert_node(Node::new(NodeID(id), LonLat::new(id as f64, 0.0)));
        }
        let mut a = Way::new(WayID(7), vec![NodeID(1), NodeID(2)]);
        a.graph = Some(GraphWayComponent::new());
        let mut b = Way::new(WayID(3), vec![NodeID(2), NodeID(3)]);
        b.graph = Some(GraphWayComponent::new());
        ds.insert_way(a);
        ds.insert_way(b);
        ds
    }

    #[test]
    fn ids_start_after_existing_ways() {
        let ds = two_ways();
        let mut ids = SequentialWayIds::after(&ds);
        assert_eq!(ids.next(), WayID(8));
        assert_eq!(ids.next(), WayID(9));

        let mut ids = SequentialWayIds::after(&DataSet::new());
        assert_eq!(ids.next(), WayID(0));
    }

    #[test]
    fn symmetry_checker_spots_one_sided_connectors() {
        let mut ds = two_ways();
        let c = Connector::new(NodeID(2), WayID(7), WayID(3));
        c.add(&mut ds);
        assert!(check_connector_symmetry(&ds).is_ok());
        assert_eq!(ds.connector_count(), 1);

        ds.graph_mut(WayID(3)).unwrap().incoming.clear();
        assert!(check_connector_symmetry(&ds).is_err());
    }

    #[test]
    fn symmetry_checker_rejects_interior_uturns() {
        let mut ds = two_ways();
        ds.ways.get_mut(&WayID(7)).unwrap().nodes = vec![NodeID(1), NodeID(2), NodeID(3)];
        ds.graph_mut(WayID(7))
            .unwrap()
            .uturn
            .insert(Connector::new(NodeID(2), WayID(7), WayID(7)));
        assert!(check_connector_symmetry(&ds).is_err());
    }
}
