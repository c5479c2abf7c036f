use std::collections::BTreeSet;

use streetutil::Timer;

use crate::connector::Connector;
use crate::dataset::DataSet;
use crate::relation::RestrictionRelation;
use crate::types::{FeatureID, NodeID, WayID};

/// Edits connectors according to every turn restriction that goes through a single node.
/// Restrictions that can't be resolved are skipped, never fatal. Returns the number of connectors
/// removed.
pub fn apply_restrictions(ds: &mut DataSet, streetgraph: FeatureID, timer: &mut Timer) -> usize {
    timer.start("apply turn restrictions");
    let relations: Vec<RestrictionRelation> = ds.restrictions.values().cloned().collect();

    let mut removed = 0;
    let mut skipped = 0;
    for r in &relations {
        let via = match r.via_node() {
            Some(n) if ds.nodes.contains_key(&n) => n,
            _ => {
                skipped += 1;
                continue;
            }
        };

        for from in &r.from {
            let is_graph_member = ds
                .ways
                .get(from)
                .map(|w| w.is_member_of(streetgraph) && w.graph.is_some())
                .unwrap_or(false);
            if !is_graph_member {
                continue;
            }

            removed += if r.restriction.is_only_type() {
                retain_only(ds, via, *from, &r.to)
            } else {
                forbid(ds, via, *from, &r.to)
            };
        }
    }

    if skipped > 0 {
        timer.note(format!(
            "Skipped {} turn restrictions without a single known via node",
            skipped
        ));
    }
    timer.stop("apply turn restrictions");
    removed
}

/// Of the movements out of `from` at `via`, keep only those to the listed ways. Turning back onto
/// `from` counts as a movement too.
fn retain_only(ds: &mut DataSet, via: NodeID, from: WayID, to: &[WayID]) -> usize {
    let retained: BTreeSet<Connector> = to
        .iter()
        .filter_map(|to| Connector::try_create(ds, via, from, *to))
        .collect();
    let remove: Vec<Connector> = match ds.graph(from) {
        Some(g) => g
            .outgoing
            .iter()
            .chain(g.uturn.iter())
            .filter(|c| c.via == via && !retained.contains(c))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    let mut count = 0;
    for c in remove {
        if c.remove(ds) {
            count += 1;
        }
    }
    count
}

fn forbid(ds: &mut DataSet, via: NodeID, from: WayID, to: &[WayID]) -> usize {
    let mut count = 0;
    for to in to {
        if let Some(c) = Connector::try_create(ds, via, from, *to) {
            if c.remove(ds) {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::connect;
    use crate::dataset::check_connector_symmetry;
    use crate::graph_way::GraphWayComponent;
    use crate::relation::{Restriction, ViaType};
    use crate::street::{Oneway, StreetComponent, StreetType};
    use crate::types::{LonLat, Node, RelationID, Way};

    const STREETS: FeatureID = FeatureID(10);

    fn star() -> DataSet {
        // Ways 100, 200, 300 all end at node 5
        let mut ds = DataSet::new();
        for n in 1..=5 {
            ds.insert_node(Node::new(NodeID(n), LonLat::new(n as f64, 0.0)));
        }
        for (id, start) in &[(100, 1), (200, 2), (300, 3)] {
            let mut w = Way::new(WayID(*id), vec![NodeID(*start), NodeID(5)]);
            w.features.insert(STREETS);
            w.street = Some(StreetComponent::new(StreetType::Residential, Oneway::No));
            w.graph = Some(GraphWayComponent::new());
            ds.insert_way(w);
        }
        for from in &[100, 200, 300] {
            for to in &[100, 200, 300] {
                connect(&mut ds, NodeID(5), WayID(*from), WayID(*to));
            }
        }
        ds
    }

    fn restriction(restriction: Restriction, via: Vec<i64>, to: Vec<i64>) -> RestrictionRelation {
        RestrictionRelation {
            id: RelationID(1),
            restriction,
            from: vec![WayID(100)],
            to: to.into_iter().map(WayID).collect(),
            via,
            via_type: ViaType::Node,
        }
    }

    fn outgoing(ds: &DataSet, id: i64) -> Vec<i64> {
        ds.graph(WayID(id))
            .unwrap()
            .outgoing
            .iter()
            .map(|c| c.to.0)
            .collect()
    }

    #[test]
    fn only_keeps_the_listed_movement() {
        let mut ds = star();
        ds.insert_restriction(restriction(Restriction::OnlyStraightOn, vec![5], vec![200]));
        assert!(ds
            .graph(WayID(100))
            .unwrap()
            .uturn
            .contains(&Connector::new(NodeID(5), WayID(100), WayID(100))));

        let removed = apply_restrictions(&mut ds, STREETS, &mut Timer::throwaway());
        // Turning left and turning around are both gone
        assert_eq!(removed, 2);
        assert_eq!(outgoing(&ds, 100), vec![200]);
        assert!(!ds
            .graph(WayID(100))
            .unwrap()
            .uturn
            .contains(&Connector::new(NodeID(5), WayID(100), WayID(100))));
        assert!(ds
            .graph(WayID(100))
            .unwrap()
            .outgoing
            .contains(&Connector::new(NodeID(5), WayID(100), WayID(200))));
        // Other ways are untouched
        assert_eq!(outgoing(&ds, 300), vec![100, 200]);
        check_connector_symmetry(&ds).unwrap();
    }

    #[test]
    fn only_u_turn_keeps_turning_around() {
        let mut ds = star();
        ds.insert_restriction(restriction(Restriction::OnlyUTurn, vec![5], vec![100]));
        assert_eq!(
            apply_restrictions(&mut ds, STREETS, &mut Timer::throwaway()),
            2
        );
        let g = ds.graph(WayID(100)).unwrap();
        assert!(g.outgoing.is_empty());
        assert!(g.uturn.contains(&Connector::new(NodeID(5), WayID(100), WayID(100))));
        check_connector_symmetry(&ds).unwrap();
    }

    #[test]
    fn no_removes_the_listed_movement() {
        let mut ds = star();
        ds.insert_restriction(restriction(Restriction::NoLeftTurn, vec![5], vec![300]));
        apply_restrictions(&mut ds, STREETS, &mut Timer::throwaway());
        assert_eq!(outgoing(&ds, 100), vec![200]);
        assert!(!ds.graph(WayID(100)).unwrap().uturn.is_empty());
        check_connector_symmetry(&ds).unwrap();
    }

    #[test]
    fn no_u_turn() {
        let mut ds = star();
        ds.insert_restriction(restriction(Restriction::NoUTurn, vec![5], vec![100]));
        apply_restrictions(&mut ds, STREETS, &mut Timer::throwaway());
        let g = ds.graph(WayID(100)).unwrap();
        assert!(!g.uturn.contains(&Connector::new(NodeID(5), WayID(100), WayID(100))));
        assert_eq!(outgoing(&ds, 100), vec![200, 300]);
    }

    #[test]
    fn unresolvable_restrictions_are_skipped() {
        let mut ds = star();
        let before = ds.clone();
        ds.insert_restriction(restriction(Restriction::NoLeftTurn, vec![42], vec![300]));
        let mut r = restriction(Restriction::OnlyLeftTurn, vec![5, 4], vec![300]);
        r.id = RelationID(2);
        ds.insert_restriction(r);
        let mut r = restriction(Restriction::OnlyLeftTurn, vec![5], vec![300]);
        r.id = RelationID(3);
        r.from = vec![WayID(999)];
        ds.insert_restriction(r);

        assert_eq!(apply_restrictions(&mut ds, STREETS, &mut Timer::throwaway()), 0);
        assert_eq!(ds.ways, before.ways);
    }
}
