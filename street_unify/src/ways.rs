use std::collections::BTreeSet;

use anyhow::Result;

use crate::dataset::{DataSet, WayIdGenerator};
use crate::degree::NodeDegrees;
use crate::graph_way;
use crate::layout::WayLayout;
use crate::types::{NodeID, Way, WayID};

/// Two ways that can be joined into one at `node`. Only valid until the dataset changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergePoint {
    pub node: NodeID,
    pub a: WayID,
    pub b: WayID,
    pub layout: WayLayout,
}

/// Nodes where the tracker saw this way more than once.
pub fn self_intersection_points(tracker: &NodeDegrees, way: &Way) -> BTreeSet<NodeID> {
    way.nodes
        .iter()
        .filter(|n| tracker.count_of(**n, way.id) > 1)
        .cloned()
        .collect()
}

/// Cuts a way at the given interior node indices (ascending) into fresh ways with new IDs, and
/// returns their IDs in order. With no split points, this just re-identifies the way.
///
/// The tracker must describe the dataset before the split; it's used to find where the way
/// crosses itself.
pub fn split(
    ds: &mut DataSet,
    tracker: &NodeDegrees,
    id: WayID,
    split_indices: &[usize],
    ids: &mut dyn WayIdGenerator,
) -> Result<Vec<WayID>> {
    let way = match ds.ways.remove(&id) {
        Some(w) => w,
        None => bail!("can't split {}, it doesn't exist", id),
    };
    for idx in split_indices {
        if *idx == 0 || *idx >= way.nodes.len() - 1 {
            let nodes = way.nodes.clone();
            ds.insert_way(way);
            bail!("can't split {} at {}, not an interior index of {:?}", id, idx, nodes);
        }
    }

    let mut segments = Vec::new();
    let mut last = 0;
    for idx in split_indices
        .iter()
        .cloned()
        .chain(std::iter::once(way.nodes.len() - 1))
    {
        let segment = way.segment(ids.next(), way.nodes[last..=idx].to_vec());
        segments.push(segment.id);
        ds.insert_way(segment);
        last = idx;
    }

    graph_way::split(ds, tracker, &way, &segments);
    Ok(segments)
}

/// Decides if two ways meeting at `node` can be joined without changing anything observable.
pub fn mergepoint(ds: &DataSet, node: NodeID, a: WayID, b: WayID) -> Option<MergePoint> {
    if a == b {
        return None;
    }
    let way_a = ds.ways.get(&a)?;
    let way_b = ds.ways.get(&b)?;

    if way_a.features != way_b.features {
        return None;
    }
    let layout = WayLayout::classify(node, &way_a.nodes, &way_b.nodes)?;
    if !layout.is_adjacent() {
        return None;
    }
    if way_a.component_kinds() != way_b.component_kinds() {
        return None;
    }

    let aligned = layout.is_aligned();
    if let (Some(sa), Some(sb)) = (&way_a.street, &way_b.street) {
        let ok = if aligned {
            sa == sb
        } else {
            sa.reverse_eq(sb)
        };
        if !ok {
            return None;
        }
    }
    if way_a.graph.is_some() && !graph_way::mergeable(ds, layout, node, a, b) {
        return None;
    }
    if way_a.sanitizer != way_b.sanitizer || way_a.tags != way_b.tags {
        return None;
    }

    Some(MergePoint { node, a, b, layout })
}

/// Joins the two ways of a merge point, returning the surviving way. The other is removed from
/// the dataset and the tracker.
pub fn merge(ds: &mut DataSet, tracker: &mut NodeDegrees, mp: MergePoint) -> Result<WayID> {
    if !ds.ways.contains_key(&mp.a) || !ds.ways.contains_key(&mp.b) {
        bail!("stale merge point {:?}", mp);
    }

    // Lay the ways out as keep -> discard
    let (keep, discard) = match mp.layout {
        WayLayout::EndStart => (mp.a, mp.b),
        WayLayout::StartEnd => (mp.b, mp.a),
        WayLayout::StartStart => {
            reverse(ds, mp.a);
            (mp.a, mp.b)
        }
        WayLayout::EndEnd => {
            reverse(ds, mp.b);
            (mp.a, mp.b)
        }
        _ => bail!("{:?} can't be merged", mp),
    };

    let discard_nodes = ds.ways[&discard].nodes.clone();
    if let Some(w) = ds.ways.get_mut(&keep) {
        w.nodes.pop();
        w.nodes.extend(discard_nodes.iter().cloned());
    }

    for node in &discard_nodes {
        tracker.remove_all(*node, discard);
    }
    for node in &discard_nodes[1..] {
        tracker.add(*node, keep);
    }

    graph_way::merge(ds, mp.node, keep, discard);
    ds.ways.remove(&discard);
    Ok(keep)
}

pub fn reverse(ds: &mut DataSet, id: WayID) {
    if let Some(w) = ds.ways.get_mut(&id) {
        w.reverse();
    }
}
