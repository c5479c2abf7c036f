use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::connector::{connect, Connector};
use crate::dataset::DataSet;
use crate::degree::NodeDegrees;
use crate::layout::WayLayout;
use crate::street::Oneway;
use crate::types::{NodeID, Way, WayID};
use crate::ways::self_intersection_points;

/// Connectivity of one street-graph way.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphWayComponent {
    /// U-turns onto this same way, only at its endpoints
    pub uturn: BTreeSet<Connector>,
    /// Connectors with this way as `from`
    pub outgoing: BTreeSet<Connector>,
    /// Connectors with this way as `to`
    pub incoming: BTreeSet<Connector>,

    // Only meaningful when the first and last node are the same. These describe the implicit
    // movement across the closing node.
    pub cyclic_start_to_end: bool,
    pub cyclic_end_to_start: bool,
}

impl GraphWayComponent {
    pub fn new() -> GraphWayComponent {
        GraphWayComponent::default()
    }

    /// Derive the cyclic flags purely from direction. Non-cyclic ways have neither.
    pub fn set_cyclic_flags(&mut self, cyclic: bool, oneway: Oneway) {
        if !cyclic {
            self.cyclic_start_to_end = false;
            self.cyclic_end_to_start = false;
            return;
        }
        match oneway.normalized() {
            Oneway::Forward => {
                self.cyclic_start_to_end = false;
                self.cyclic_end_to_start = true;
            }
            Oneway::Backward => {
                self.cyclic_start_to_end = true;
                self.cyclic_end_to_start = false;
            }
            _ => {
                self.cyclic_start_to_end = true;
                self.cyclic_end_to_start = true;
            }
        }
    }

    /// Connectors are keyed by node IDs, so reversing the way only affects the cyclic flags.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.cyclic_start_to_end, &mut self.cyclic_end_to_start);
    }

    pub fn len(&self) -> usize {
        self.uturn.len() + self.outgoing.len() + self.incoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `other` (belonging to `other_id`) connects to the same places as this one does.
    /// Connectors between the two ways themselves are skipped.
    pub fn equivalent_to(&self, other: &GraphWayComponent, other_id: WayID) -> bool {
        self.cyclic_start_to_end == other.cyclic_start_to_end
            && self.cyclic_end_to_start == other.cyclic_end_to_start
            && self.connectors_match(other, other_id)
    }

    /// Like `equivalent_to`, for a way running the opposite direction.
    pub fn reverse_equivalent_to(&self, other: &GraphWayComponent, other_id: WayID) -> bool {
        self.cyclic_start_to_end == other.cyclic_end_to_start
            && self.cyclic_end_to_start == other.cyclic_start_to_end
            && self.connectors_match(other, other_id)
    }

    fn connectors_match(&self, other: &GraphWayComponent, other_id: WayID) -> bool {
        if self.uturn.len() != other.uturn.len()
            || self.outgoing.len() != other.outgoing.len()
            || self.incoming.len() != other.incoming.len()
        {
            return false;
        }

        self.uturn
            .iter()
            .all(|c| other.uturn.contains(&Connector::new(c.via, other_id, other_id)))
            && self
                .outgoing
                .iter()
                .filter(|c| c.to != other_id)
                .all(|c| other.outgoing.contains(&Connector::new(c.via, other_id, c.to)))
            && self
                .incoming
                .iter()
                .filter(|c| c.from != other_id)
                .all(|c| other.incoming.contains(&Connector::new(c.via, c.from, other_id)))
    }
}

/// Merging `a` and `b` at `node` must neither create nor destroy connectivity, so every movement
/// between the two that their directions allow has to exist already.
pub fn mergeable(ds: &DataSet, layout: WayLayout, node: NodeID, a: WayID, b: WayID) -> bool {
    let (way_a, way_b) = match (ds.ways.get(&a), ds.ways.get(&b)) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return false;
        }
    };
    let (graph_a, graph_b) = match (way_a.graph.as_ref(), way_b.graph.as_ref()) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return false;
        }
    };

    let mut needs_a_to_b = true;
    let mut needs_b_to_a = true;
    if let (Some(sa), Some(sb)) = (&way_a.street, &way_b.street) {
        needs_a_to_b = layout.connection_possible(sa.oneway, sb.oneway);
        needs_b_to_a = layout.swapped().connection_possible(sb.oneway, sa.oneway);
    }

    if needs_a_to_b {
        let ab = Connector::new(node, a, b);
        if !graph_a.outgoing.contains(&ab) && !graph_b.incoming.contains(&ab) {
            return false;
        }
    }
    if needs_b_to_a {
        let ba = Connector::new(node, b, a);
        if !graph_b.outgoing.contains(&ba) && !graph_a.incoming.contains(&ba) {
            return false;
        }
    }
    true
}

/// Folds the connectivity of `discard` into `keep`. The caller has already laid the ways out as
/// keep-then-discard and appended the nodes of `discard` to `keep`; afterwards, `discard` has no
/// graph component left and nothing refers to it.
pub fn merge(ds: &mut DataSet, node: NodeID, keep: WayID, discard: WayID) {
    // The merge point becomes interior
    if let Some(g) = ds.graph_mut(keep) {
        g.uturn.remove(&Connector::new(node, keep, keep));
    }
    if let Some(g) = ds.graph_mut(discard) {
        g.uturn.remove(&Connector::new(node, discard, discard));
    }
    Connector::new(node, keep, discard).remove(ds);
    Connector::new(node, discard, keep).remove(ds);

    // Did the two ways close a loop?
    let closing = ds
        .ways
        .get(&keep)
        .filter(|w| w.is_cyclic())
        .map(|w| w.first_node());
    if let Some(via) = closing {
        let kd = Connector::new(via, keep, discard);
        let dk = Connector::new(via, discard, keep);
        if let Some(g) = ds.graph_mut(keep) {
            if g.outgoing.contains(&kd) {
                g.cyclic_start_to_end = true;
            }
            if g.incoming.contains(&dk) {
                g.cyclic_end_to_start = true;
            }
        }
        kd.remove(ds);
        dk.remove(ds);
    }

    let absorbed = match ds.ways.get_mut(&discard).and_then(|w| w.graph.take()) {
        Some(g) => g,
        None => {
            return;
        }
    };
    for c in &absorbed.uturn {
        if c.via == node {
            continue;
        }
        connect(ds, c.via, keep, keep);
    }
    // Movements between the two halves elsewhere become self-connections and are dropped.
    for c in &absorbed.outgoing {
        if let Some(g) = ds.graph_mut(c.to) {
            g.incoming.remove(c);
        }
        if c.to != keep {
            connect(ds, c.via, keep, c.to);
        }
    }
    for c in &absorbed.incoming {
        if let Some(g) = ds.graph_mut(c.from) {
            g.outgoing.remove(c);
        }
        if c.from != keep {
            connect(ds, c.via, c.from, keep);
        }
    }
}

/// Rebuilds connectivity after `way` was cut into `segments`, which must already be in the
/// dataset with empty graph components. `way` itself must no longer be in the dataset.
pub fn split(ds: &mut DataSet, tracker: &NodeDegrees, way: &Way, segments: &[WayID]) {
    let graph = match way.graph {
        Some(ref g) => g,
        None => {
            return;
        }
    };
    if segments.is_empty() {
        return;
    }

    // Neighbours forget the original
    for c in &graph.outgoing {
        if let Some(g) = ds.graph_mut(c.to) {
            g.incoming.remove(c);
        }
    }
    for c in &graph.incoming {
        if let Some(g) = ds.graph_mut(c.from) {
            g.outgoing.remove(c);
        }
    }

    // Re-derive old connectors on whichever segment ends at the via node. The segment's own
    // geometry decides whether the movement is still legal.
    for seg in segments {
        let (first, last) = match ds.ways.get(seg) {
            Some(w) => (w.first_node(), w.last_node()),
            None => continue,
        };
        let touches = |via: NodeID| via == first || via == last;

        for c in &graph.uturn {
            if touches(c.via) {
                connect(ds, c.via, *seg, *seg);
            }
        }
        for c in &graph.outgoing {
            if touches(c.via) {
                connect(ds, c.via, *seg, c.to);
            }
        }
        for c in &graph.incoming {
            if touches(c.via) {
                connect(ds, c.via, c.from, *seg);
            }
        }
    }

    let first_seg = segments[0];
    let last_seg = segments[segments.len() - 1];

    // The implicit movement across the closing node becomes explicit
    if way.is_cyclic() && first_seg != last_seg {
        let via = way.first_node();
        if graph.cyclic_start_to_end {
            connect(ds, via, first_seg, last_seg);
        }
        if graph.cyclic_end_to_start {
            connect(ds, via, last_seg, first_seg);
        }
    }

    // The original way continued through every split point
    for pair in segments.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let via = match ds.ways.get(&next) {
            Some(w) => w.first_node(),
            None => continue,
        };
        connect(ds, via, prev, prev);
        connect(ds, via, prev, next);
        connect(ds, via, next, prev);
        connect(ds, via, next, next);
    }

    // We don't know which movements are legal where a way crosses itself, so assume all of them
    // are. Only the closing node of a cyclic way is exempt between the first and last segment,
    // since the cyclic flags already decided that pair.
    for x in self_intersection_points(tracker, way) {
        let adjacent: Vec<WayID> = segments
            .iter()
            .cloned()
            .filter(|s| {
                ds.ways
                    .get(s)
                    .map(|w| w.is_endpoint(x))
                    .unwrap_or(false)
            })
            .collect();
        let closing = way.is_cyclic() && x == way.first_node();

        for w1 in &adjacent {
            for w2 in &adjacent {
                if w1 == w2 {
                    continue;
                }
                if closing
                    && ((*w1 == first_seg && *w2 == last_seg)
                        || (*w1 == last_seg && *w2 == first_seg))
                {
                    continue;
                }
                connect(ds, x, *w1, *w2);
                connect(ds, x, *w2, *w1);
            }
        }
    }

    for seg in segments {
        if let Some(w) = ds.ways.get_mut(seg) {
            let cyclic = w.is_cyclic();
            let oneway = w.street.as_ref().map(|s| s.oneway).unwrap_or(Oneway::No);
            if let Some(ref mut g) = w.graph {
                g.set_cyclic_flags(cyclic, oneway);
            }
        }
    }
}

/// Removes every reference to this way from its neighbours and clears its own connectors.
pub fn detach(ds: &mut DataSet, id: WayID) {
    let graph = match ds.graph_mut(id) {
        Some(g) => std::mem::take(g),
        None => {
            return;
        }
    };
    for c in &graph.outgoing {
        if let Some(g) = ds.graph_mut(c.to) {
            g.incoming.remove(c);
        }
    }
    for c in &graph.incoming {
        if let Some(g) = ds.graph_mut(c.from) {
            g.outgoing.remove(c);
        }
    }
    if let Some(g) = ds.graph_mut(id) {
        g.cyclic_start_to_end = graph.cyclic_start_to_end;
        g.cyclic_end_to_start = graph.cyclic_end_to_start;
    }
}
