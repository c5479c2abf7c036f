use std::collections::BTreeSet;

use anyhow::Result;

use streetutil::MultiMap;

use crate::dataset::DataSet;
use crate::degree::NodeDegrees;
use crate::graph_way;
use crate::processor::{Context, Processor};
use crate::types::{FeatureID, NodeID, Way, WayID};
use crate::ways;

/// Ways that still share the same nodes after deduplication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoubledWays {
    pub nodes: Vec<NodeID>,
    pub ways: Vec<WayID>,
}

/// Normalizes the street graph right after it's been split at junctions. Ways that go A-B-A are
/// cut in half, and ways that duplicate another way's geometry and attributes are removed.
#[derive(Default)]
pub struct StreetGraphSanitizer {
    doubled: Vec<DoubledWays>,
}

impl StreetGraphSanitizer {
    pub fn new() -> StreetGraphSanitizer {
        StreetGraphSanitizer::default()
    }

    /// What the last run couldn't deduplicate.
    pub fn doubled_ways(&self) -> &Vec<DoubledWays> {
        &self.doubled
    }
}

impl Processor for StreetGraphSanitizer {
    fn execute(&mut self, ctx: &mut Context, ds: &mut DataSet) -> Result<()> {
        ctx.timer.start("sanitize street graph");

        let tracker = NodeDegrees::build(ds, ctx.streetgraph)?;
        let aba: Vec<WayID> = ds
            .ways
            .values()
            .filter(|w| w.is_member_of(ctx.streetgraph) && w.nodes.len() == 3 && w.is_cyclic())
            .map(|w| w.id)
            .collect();
        for id in &aba {
            ways::split(ds, &tracker, *id, &[1], ctx.ids)?;
        }
        if !aba.is_empty() {
            ctx.timer.note(format!("Split {} A-B-A ways", aba.len()));
        }

        let mut tracker = NodeDegrees::build(ds, ctx.streetgraph)?;
        let removed = find_duplicates(ds, &mut tracker, ctx.streetgraph);
        for id in &removed {
            graph_way::detach(ds, *id);
            ds.ways.remove(id);
        }
        if !removed.is_empty() {
            ctx.timer
                .note(format!("Removed {} doubled ways", removed.len()));
        }

        self.doubled = remaining_doubled_ways(ds, ctx.streetgraph);
        for group in &self.doubled {
            let nodes: Vec<String> = group.nodes.iter().map(|n| n.0.to_string()).collect();
            ctx.timer.warn(format!(
                "could not remove doubled ways between nodes {{{}}} ({})",
                nodes.join(", "),
                group.ways.len() - 1
            ));
        }

        ctx.timer.stop("sanitize street graph");
        Ok(())
    }
}

/// Scans every member way against its neighbours and picks out the duplicates to remove, keeping
/// the first way of each group. The tracker forgets removed ways as they're found.
fn find_duplicates(ds: &DataSet, tracker: &mut NodeDegrees, streetgraph: FeatureID) -> Vec<WayID> {
    let mut removed: BTreeSet<WayID> = BTreeSet::new();
    for way in ds.ways.values() {
        if !way.is_member_of(streetgraph) || removed.contains(&way.id) {
            continue;
        }

        let mut neighbors = BTreeSet::new();
        for node in &way.nodes {
            neighbors.extend(tracker.ways(*node));
        }
        for other in neighbors {
            if other == way.id || removed.contains(&other) {
                continue;
            }
            let other_way = match ds.ways.get(&other) {
                Some(w) => w,
                None => continue,
            };
            if is_doubled(way, other_way) {
                tracker.remove_way(&other_way.nodes, other);
                removed.insert(other);
            }
        }
    }
    removed.into_iter().collect()
}

/// Same nodes (maybe reversed), same features, and indistinguishable components.
fn is_doubled(a: &Way, b: &Way) -> bool {
    if a.features != b.features || a.component_kinds() != b.component_kinds() {
        return false;
    }

    let aligned = if a.nodes == b.nodes {
        true
    } else if a.nodes.iter().eq(b.nodes.iter().rev()) {
        false
    } else {
        return false;
    };

    if a.tags != b.tags || a.sanitizer != b.sanitizer {
        return false;
    }
    if let (Some(sa), Some(sb)) = (&a.street, &b.street) {
        let same = if aligned { sa == sb } else { sa.reverse_eq(sb) };
        if !same {
            return false;
        }
    }
    if let (Some(ga), Some(gb)) = (&a.graph, &b.graph) {
        let same = if aligned {
            ga.equivalent_to(gb, b.id)
        } else {
            ga.reverse_equivalent_to(gb, b.id)
        };
        if !same {
            return false;
        }
    }
    true
}

fn remaining_doubled_ways(ds: &DataSet, streetgraph: FeatureID) -> Vec<DoubledWays> {
    let mut by_nodes: MultiMap<Vec<NodeID>, WayID> = MultiMap::new();
    for way in ds.ways.values() {
        if !way.is_member_of(streetgraph) {
            continue;
        }
        let mut reversed = way.nodes.clone();
        reversed.reverse();
        let key = std::cmp::min(way.nodes.clone(), reversed);
        by_nodes.insert(key, way.id);
    }

    by_nodes
        .iter()
        .filter(|(_, ways)| ways.len() > 1)
        .map(|(nodes, ways)| DoubledWays {
            nodes: nodes.clone(),
            ways: ways.iter().cloned().collect(),
        })
        .collect()
}
