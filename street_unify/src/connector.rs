use serde::{Deserialize, Serialize};

use crate::dataset::DataSet;
use crate::layout::WayLayout;
use crate::street::Oneway;
use crate::types::{NodeID, WayID};

/// A legal movement from one way onto another through a shared node. `from == to` is a u-turn.
///
/// Every connector is stored twice: as outgoing on `from` and incoming on `to`. U-turns are only
/// stored once, in the way's own u-turn set. All mutation goes through `add` and `remove` to keep
/// both copies in sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connector {
    pub via: NodeID,
    pub from: WayID,
    pub to: WayID,
}

impl Connector {
    pub fn new(via: NodeID, from: WayID, to: WayID) -> Connector {
        Connector { via, from, to }
    }

    pub fn is_uturn(&self) -> bool {
        self.from == self.to
    }

    /// Validates a movement against the current geometry and direction of both ways.
    ///
    /// Fails if either way is missing or isn't part of the graph, if the node isn't on both ways,
    /// if a u-turn is requested away from an endpoint or on a one-way street, if only one of the
    /// ways has street attributes, or if the direction of travel forbids the movement. A one-way
    /// loop meets itself as a crossing at its closing node, but continuing around it is already
    /// covered by the cyclic flags.
    pub fn try_create(ds: &DataSet, via: NodeID, from: WayID, to: WayID) -> Option<Connector> {
        let from_way = ds.ways.get(&from)?;
        let to_way = ds.ways.get(&to)?;
        if from_way.graph.is_none() || to_way.graph.is_none() {
            return None;
        }

        if from == to && !from_way.is_endpoint(via) {
            return None;
        }

        let layout = WayLayout::classify(via, &from_way.nodes, &to_way.nodes)?;
        match (&from_way.street, &to_way.street) {
            (Some(a), Some(b)) => {
                if from == to && a.oneway.normalized() != Oneway::No {
                    return None;
                }
                if !layout.connection_possible(a.oneway, b.oneway) {
                    return None;
                }
            }
            (None, None) => {}
            _ => {
                return None;
            }
        }

        Some(Connector::new(via, from, to))
    }

    /// Idempotent.
    pub fn add(self, ds: &mut DataSet) {
        if self.is_uturn() {
            if let Some(g) = ds.graph_mut(self.to) {
                g.uturn.insert(self);
            }
            return;
        }
        if let Some(g) = ds.graph_mut(self.from) {
            g.outgoing.insert(self);
        }
        if let Some(g) = ds.graph_mut(self.to) {
            g.incoming.insert(self);
        }
    }

    /// Removing something that isn't there is a no-op. Returns true if anything changed.
    pub fn remove(&self, ds: &mut DataSet) -> bool {
        if self.is_uturn() {
            return ds
                .graph_mut(self.to)
                .map(|g| g.uturn.remove(self))
                .unwrap_or(false);
        }
        let mut changed = false;
        if let Some(g) = ds.graph_mut(self.from) {
            changed |= g.outgoing.remove(self);
        }
        if let Some(g) = ds.graph_mut(self.to) {
            changed |= g.incoming.remove(self);
        }
        changed
    }
}

/// `try_create` followed by `add`. Returns true if the movement is legal.
pub fn connect(ds: &mut DataSet, via: NodeID, from: WayID, to: WayID) -> bool {
    match Connector::try_create(ds, via, from, to) {
        Some(c) => {
            c.add(ds);
            true
        }
        None => false,
    }
}
