use anyhow::Result;
use serde::{Deserialize, Serialize};

use streetutil::{prettyprint_usize, Timer};

use crate::connector::connect;
use crate::dataset::{DataSet, WayIdGenerator};
use crate::degree::NodeDegrees;
use crate::features::FeatureSystem;
use crate::graph_way::GraphWayComponent;
use crate::restrictions::apply_restrictions;
use crate::sanitize::{DataSetSanitizer, SanitizerValues, StreetGraphSanitizer};
use crate::street::Oneway;
use crate::types::{FeatureID, WayID};
use crate::ways;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifyConfig {
    /// Feature generators up to and including this index run before unification.
    pub idx_before: i32,
    /// The generator-index of the street graph itself.
    pub idx_streetgraph: i32,
    /// Ways in this feature are unified. Everything else is only re-identified.
    pub streetgraph: FeatureID,
    pub sanitizer: SanitizerValues,
}

impl Default for UnifyConfig {
    fn default() -> UnifyConfig {
        UnifyConfig {
            idx_before: 0,
            idx_streetgraph: 10,
            streetgraph: FeatureID(10),
            sanitizer: SanitizerValues::default(),
        }
    }
}

/// What a processing step gets to use besides the dataset.
pub struct Context<'a> {
    pub streetgraph: FeatureID,
    pub ids: &'a mut dyn WayIdGenerator,
    pub timer: &'a mut Timer,
}

/// One replaceable step over the whole dataset, like a sanitizer.
pub trait Processor {
    fn execute(&mut self, ctx: &mut Context, ds: &mut DataSet) -> Result<()>;
}

/// Unifies the street graph: every junction becomes an endpoint of the ways meeting there, turn
/// restrictions become missing connectors, and then ways are merged back together wherever
/// nothing observable distinguishes them.
pub struct OsmProcessor {
    config: UnifyConfig,
    features: Box<dyn FeatureSystem>,
    ids: Box<dyn WayIdGenerator>,
    dataset_sanitizer: Box<dyn Processor>,
    streetgraph_sanitizer: Box<dyn Processor>,
}

impl OsmProcessor {
    pub fn new(
        config: UnifyConfig,
        features: Box<dyn FeatureSystem>,
        ids: Box<dyn WayIdGenerator>,
    ) -> Result<OsmProcessor> {
        let dataset_sanitizer = Box::new(DataSetSanitizer::new(config.sanitizer.clone()));
        OsmProcessor::with_sanitizers(
            config,
            features,
            ids,
            dataset_sanitizer,
            Box::new(StreetGraphSanitizer::new()),
        )
    }

    pub fn with_sanitizers(
        config: UnifyConfig,
        features: Box<dyn FeatureSystem>,
        ids: Box<dyn WayIdGenerator>,
        dataset_sanitizer: Box<dyn Processor>,
        streetgraph_sanitizer: Box<dyn Processor>,
    ) -> Result<OsmProcessor> {
        if config.idx_before >= config.idx_streetgraph {
            bail!(
                "idx_before ({}) must be smaller than idx_streetgraph ({})",
                config.idx_before,
                config.idx_streetgraph
            );
        }
        Ok(OsmProcessor {
            config,
            features,
            ids,
            dataset_sanitizer,
            streetgraph_sanitizer,
        })
    }

    pub fn execute(&mut self, ds: &mut DataSet, timer: &mut Timer) -> Result<()> {
        let streetgraph = self.config.streetgraph;
        info!(
            "Unifying {} ways over {} nodes",
            prettyprint_usize(ds.ways.len()),
            prettyprint_usize(ds.nodes.len())
        );

        {
            let mut ctx = Context {
                streetgraph,
                ids: self.ids.as_mut(),
                timer: &mut *timer,
            };
            self.dataset_sanitizer.execute(&mut ctx, ds)?;
        }

        timer.start("seed street graph");
        let tracker = NodeDegrees::build(ds, streetgraph)?;
        seed_connectors(ds, &tracker, streetgraph);
        timer.stop("seed street graph");

        let removed = apply_restrictions(ds, streetgraph, timer);
        info!("Turn restrictions removed {} connectors", removed);

        self.features
            .generate_all_features(ds, i32::MIN, self.config.idx_before, timer)?;

        timer.start("split ways at junctions");
        let tracker = NodeDegrees::build(ds, streetgraph)?;
        let splits = split_at_junctions(ds, &tracker, streetgraph, self.ids.as_mut(), timer)?;
        drop(tracker);
        timer.stop("split ways at junctions");
        info!("Split {} times at junctions", prettyprint_usize(splits));

        {
            let mut ctx = Context {
                streetgraph,
                ids: self.ids.as_mut(),
                timer: &mut *timer,
            };
            self.streetgraph_sanitizer.execute(&mut ctx, ds)?;
        }

        timer.start("merge ways");
        let mut tracker = NodeDegrees::build(ds, streetgraph)?;
        let merged = merge_all(ds, &mut tracker)?;
        drop(tracker);
        timer.stop("merge ways");
        info!(
            "Merged {} pairs of ways, {} ways and {} connectors left",
            prettyprint_usize(merged),
            prettyprint_usize(ds.ways.len()),
            prettyprint_usize(ds.connector_count())
        );

        let before = self.config.idx_before;
        let idx = self.config.idx_streetgraph;
        self.features
            .generate_all_features(ds, before + 1, idx - 1, timer)?;
        self.features.generate_all_features(ds, idx, idx, timer)?;
        if let Some(after) = idx.checked_add(1) {
            self.features
                .generate_all_features(ds, after, i32::MAX, timer)?;
        }
        Ok(())
    }
}

/// Gives every member way a fresh graph component and connects everything that meets. Lone
/// endpoints get a u-turn. Non-members lose any graph component they came with.
fn seed_connectors(ds: &mut DataSet, tracker: &NodeDegrees, streetgraph: FeatureID) {
    for way in ds.ways.values_mut() {
        if !way.is_member_of(streetgraph) {
            way.graph = None;
            continue;
        }
        let oneway = way
            .street
            .as_ref()
            .map(|s| s.oneway)
            .unwrap_or(Oneway::No);
        let mut graph = GraphWayComponent::new();
        graph.set_cyclic_flags(way.is_cyclic(), oneway);
        way.graph = Some(graph);
    }

    for node in tracker.nodes() {
        let ways = tracker.ways(node);
        if ways.len() > 1 {
            for from in &ways {
                for to in &ways {
                    connect(ds, node, *from, *to);
                }
            }
        } else if tracker.count(node) == 1 {
            // connect rejects the u-turn unless this is an endpoint
            connect(ds, node, ways[0], ways[0]);
        }
    }
}

/// Cuts every member way wherever it passes through a junction. Every way gets a fresh ID, even
/// the ones that aren't split. Returns the number of cuts.
fn split_at_junctions(
    ds: &mut DataSet,
    tracker: &NodeDegrees,
    streetgraph: FeatureID,
    ids: &mut dyn WayIdGenerator,
    timer: &mut Timer,
) -> Result<usize> {
    let all_ways: Vec<WayID> = ds.ways.keys().cloned().collect();
    let mut splits = 0;
    timer.start_iter("split ways", all_ways.len());
    for id in all_ways {
        timer.next();
        let (member, split_indices) = match ds.ways.get(&id) {
            Some(way) => (
                way.is_member_of(streetgraph),
                (1..way.nodes.len().saturating_sub(1))
                    .filter(|idx| tracker.count(way.nodes[*idx]) > 1)
                    .collect::<Vec<_>>(),
            ),
            None => continue,
        };

        if member {
            splits += split_indices.len();
            ways::split(ds, tracker, id, &split_indices, ids)?;
        } else if let Some(mut way) = ds.ways.remove(&id) {
            way.id = ids.next();
            ds.insert_way(way);
        }
    }
    Ok(splits)
}

/// Repeatedly merges ways that meet only each other at a node, until nothing changes. Merging can
/// turn a way into the only other way at some node already visited, so a single pass isn't
/// enough.
fn merge_all(ds: &mut DataSet, tracker: &mut NodeDegrees) -> Result<usize> {
    let mut total = 0;
    loop {
        let mut merged = 0;
        for node in tracker.nodes() {
            if tracker.size(node) != 2 || tracker.count(node) != 2 {
                continue;
            }
            let pair = tracker.ways(node);
            if let Some(mp) = ways::mergepoint(ds, node, pair[0], pair[1]) {
                ways::merge(ds, tracker, mp)?;
                merged += 1;
            }
        }
        total += merged;
        if merged == 0 {
            return Ok(total);
        }
        debug!("Merge pass joined {} pairs, trying again", merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Connector;
    use crate::dataset::{check_connector_symmetry, SequentialWayIds};
    use crate::features::GeneratorRegistry;
    use crate::relation::{Restriction, RestrictionRelation, ViaType};
    use crate::street::{StreetComponent, StreetType};
    use crate::types::{LonLat, Node, NodeID, RelationID, Way};
    use std::cell::RefCell;
    use std::rc::Rc;

    const STREETS: FeatureID = FeatureID(10);

    fn dataset(ways: Vec<(i64, Vec<i64>, Oneway)>) -> DataSet {
        let mut ds = DataSet::new();
        for (id, nodes, oneway) in ways {
            for n in &nodes {
                ds.insert_node(Node::new(NodeID(*n), LonLat::new(*n as f64, 0.0)));
            }
            let mut w = Way::new(WayID(id), nodes.into_iter().map(NodeID).collect());
            w.features.insert(STREETS);
            w.street = Some(StreetComponent::new(StreetType::Residential, oneway));
            ds.insert_way(w);
        }
        ds
    }

    fn processor(ds: &DataSet) -> OsmProcessor {
        OsmProcessor::new(
            UnifyConfig::default(),
            Box::new(GeneratorRegistry::new()),
            Box::new(SequentialWayIds::after(ds)),
        )
        .unwrap()
    }

    fn nodes_of(ds: &DataSet) -> Vec<Vec<i64>> {
        let mut all: Vec<Vec<i64>> = ds
            .ways
            .values()
            .map(|w| w.nodes.iter().map(|n| n.0).collect())
            .collect();
        all.sort();
        all
    }

    #[test]
    fn bad_config() {
        let config = UnifyConfig {
            idx_before: 10,
            ..Default::default()
        };
        assert!(OsmProcessor::new(
            config,
            Box::new(GeneratorRegistry::new()),
            Box::new(SequentialWayIds::starting_at(0))
        )
        .is_err());
    }

    #[test]
    fn partial_config() {
        let config: UnifyConfig =
            serde_json::from_str(r#"{"idx_before": 3, "sanitizer": {"maximum_speed": 200.0}}"#)
                .unwrap();
        assert_eq!(config.idx_before, 3);
        assert_eq!(config.idx_streetgraph, 10);
        assert_eq!(config.sanitizer.maximum_speed, 200.0);
        assert_eq!(config.sanitizer.walking_speed, 4.0);
    }

    #[test]
    fn cyclic_oneway_seeding() {
        // The loop closes at a junction with a two-way spur
        let mut ds = dataset(vec![
            (1, vec![10, 11, 12, 10], Oneway::Forward),
            (2, vec![10, 13], Oneway::No),
        ]);
        let tracker = NodeDegrees::build(&ds, STREETS).unwrap();
        seed_connectors(&mut ds, &tracker, STREETS);
        let g = ds.graph(WayID(1)).unwrap();
        assert!(g.cyclic_end_to_start);
        assert!(!g.cyclic_start_to_end);
        assert!(g.uturn.is_empty());
        assert_eq!(ds.graph(WayID(2)).unwrap().uturn.len(), 2);
        check_connector_symmetry(&ds).unwrap();
    }

    #[test]
    fn chain_collapses_into_one_way() {
        // Three pieces of the same street, with a side street at node 3
        let mut ds = dataset(vec![
            (1, vec![1, 2], Oneway::No),
            (2, vec![2, 3], Oneway::No),
            (3, vec![3, 4, 5], Oneway::No),
            (4, vec![3, 6], Oneway::No),
        ]);
        processor(&ds)
            .execute(&mut ds, &mut Timer::throwaway())
            .unwrap();

        assert_eq!(
            nodes_of(&ds),
            vec![vec![1, 2, 3], vec![3, 4, 5], vec![3, 6]]
        );
        check_connector_symmetry(&ds).unwrap();
    }

    #[test]
    fn through_way_is_split_at_junction() {
        let mut ds = dataset(vec![
            (1, vec![1, 2, 3, 4, 5], Oneway::No),
            (2, vec![3, 6, 7], Oneway::No),
        ]);
        processor(&ds)
            .execute(&mut ds, &mut Timer::throwaway())
            .unwrap();

        assert_eq!(
            nodes_of(&ds),
            vec![vec![1, 2, 3], vec![3, 4, 5], vec![3, 6, 7]]
        );
        // Everything is re-identified
        assert!(ds.ways.keys().all(|id| id.0 > 2));
        check_connector_symmetry(&ds).unwrap();

        let branch = ds
            .ways
            .values()
            .find(|w| w.nodes[0] == NodeID(3) && w.nodes[1] == NodeID(6))
            .unwrap();
        let g = branch.graph.as_ref().unwrap();
        assert_eq!(g.outgoing.len(), 2);
        assert_eq!(g.incoming.len(), 2);
        // U-turns at both ends, but nowhere in the middle
        assert_eq!(
            g.uturn.iter().map(|c| c.via).collect::<Vec<_>>(),
            vec![NodeID(3), NodeID(7)]
        );
    }

    #[test]
    fn restriction_blocks_merge() {
        // Without the restriction, 1 and 2 would merge after 3 is gone
        let mut ds = dataset(vec![
            (1, vec![1, 2], Oneway::No),
            (2, vec![2, 3], Oneway::No),
        ]);
        ds.insert_restriction(RestrictionRelation {
            id: RelationID(1),
            restriction: Restriction::NoStraightOn,
            from: vec![WayID(1)],
            to: vec![WayID(2)],
            via: vec![2],
            via_type: ViaType::Node,
        });
        processor(&ds)
            .execute(&mut ds, &mut Timer::throwaway())
            .unwrap();

        assert_eq!(nodes_of(&ds), vec![vec![1, 2], vec![2, 3]]);
        check_connector_symmetry(&ds).unwrap();
        let from = ds.ways.values().find(|w| w.nodes[0] == NodeID(1)).unwrap();
        let to = ds.ways.values().find(|w| w.nodes[0] == NodeID(2)).unwrap();
        let g = from.graph.as_ref().unwrap();
        assert!(!g.outgoing.contains(&Connector::new(NodeID(2), from.id, to.id)));
        assert!(to
            .graph
            .as_ref()
            .unwrap()
            .outgoing
            .contains(&Connector::new(NodeID(2), to.id, from.id)));
    }

    #[test]
    fn restrictions_survive_splitting_the_from_way() {
        // The main street passes through the junction with the side street, which it may not
        // turn onto. The restriction names the main street before it's cut in two.
        let mut ds = dataset(vec![
            (1, vec![1, 2, 3, 4, 5], Oneway::No),
            (2, vec![3, 6], Oneway::No),
        ]);
        ds.insert_restriction(RestrictionRelation {
            id: RelationID(1),
            restriction: Restriction::NoRightTurn,
            from: vec![WayID(1)],
            to: vec![WayID(2)],
            via: vec![3],
            via_type: ViaType::Node,
        });
        processor(&ds)
            .execute(&mut ds, &mut Timer::throwaway())
            .unwrap();

        assert_eq!(nodes_of(&ds), vec![vec![1, 2, 3], vec![3, 4, 5], vec![3, 6]]);
        check_connector_symmetry(&ds).unwrap();
        let by_nodes = |nodes: &[i64]| {
            ds.ways
                .values()
                .find(|w| w.nodes.iter().map(|n| n.0).eq(nodes.iter().cloned()))
                .unwrap()
                .id
        };
        let (west, east, side) = (by_nodes(&[1, 2, 3]), by_nodes(&[3, 4, 5]), by_nodes(&[3, 6]));

        for seg in &[west, east] {
            let g = ds.graph(*seg).unwrap();
            assert!(!g.outgoing.contains(&Connector::new(NodeID(3), *seg, side)));
            assert!(ds
                .graph(side)
                .unwrap()
                .outgoing
                .contains(&Connector::new(NodeID(3), side, *seg)));
        }
        assert!(ds
            .graph(west)
            .unwrap()
            .outgoing
            .contains(&Connector::new(NodeID(3), west, east)));
        assert!(ds
            .graph(east)
            .unwrap()
            .outgoing
            .contains(&Connector::new(NodeID(3), east, west)));
    }

    #[test]
    fn non_members_are_left_alone() {
        let mut ds = dataset(vec![(1, vec![1, 2, 3], Oneway::No)]);
        let mut river = Way::new(WayID(2), vec![NodeID(2), NodeID(4)]);
        ds.insert_node(Node::new(NodeID(4), LonLat::new(4.0, 0.0)));
        river.features.insert(FeatureID(3));
        ds.insert_way(river);

        processor(&ds)
            .execute(&mut ds, &mut Timer::throwaway())
            .unwrap();

        assert_eq!(nodes_of(&ds), vec![vec![1, 2, 3], vec![2, 4]]);
        let river = ds
            .ways
            .values()
            .find(|w| w.is_member_of(FeatureID(3)))
            .unwrap();
        assert!(river.graph.is_none());
    }

    #[test]
    fn feature_phases_are_ordered() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = GeneratorRegistry::new();
        for (name, idx) in &[("late", 20), ("street", 10), ("early", -1), ("middle", 5)] {
            let seen = seen.clone();
            let label = name.to_string();
            registry.register(
                name,
                *idx,
                move |ds: &mut DataSet, _: FeatureID, _: &mut Timer| -> Result<()> {
                    // Before unification, the way hasn't been re-identified yet
                    let original = ds.ways.contains_key(&WayID(1));
                    seen.borrow_mut().push((label.clone(), original));
                    Ok(())
                },
            );
        }

        let mut ds = dataset(vec![(1, vec![1, 2], Oneway::No)]);
        let mut processor = OsmProcessor::new(
            UnifyConfig::default(),
            Box::new(registry),
            Box::new(SequentialWayIds::after(&ds)),
        )
        .unwrap();
        processor.execute(&mut ds, &mut Timer::throwaway()).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                ("early".to_string(), true),
                ("middle".to_string(), false),
                ("street".to_string(), false),
                ("late".to_string(), false),
            ]
        );
    }

    #[test]
    fn missing_nodes_abort() {
        let mut ds = dataset(vec![(1, vec![1, 2], Oneway::No)]);
        ds.nodes.remove(&NodeID(2));
        assert!(processor(&ds)
            .execute(&mut ds, &mut Timer::throwaway())
            .is_err());
    }
}
