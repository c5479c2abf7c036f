use crate::street::Oneway;
use crate::types::NodeID;

/// How two ways `a` and `b` touch at one shared node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WayLayout {
    /// <---o--->
    StartStart,
    /// <---o<---, a starts where b ends
    StartEnd,
    /// --->o--->, a ends where b starts
    EndStart,
    /// --->o<---
    EndEnd,
    /// b starts somewhere on a
    TFromA,
    /// b ends somewhere on a
    TToA,
    /// a starts somewhere on b
    TFromB,
    /// a ends somewhere on b
    TToB,
    /// The node is interior to both
    X,
}

pub const ALL_LAYOUTS: [WayLayout; 9] = [
    WayLayout::StartStart,
    WayLayout::StartEnd,
    WayLayout::EndStart,
    WayLayout::EndEnd,
    WayLayout::TFromA,
    WayLayout::TToA,
    WayLayout::TFromB,
    WayLayout::TToB,
    WayLayout::X,
];

impl WayLayout {
    /// Endpoint cases win over T cases, which win over X. `None` if the node isn't on both ways.
    pub fn classify(node: NodeID, a: &[NodeID], b: &[NodeID]) -> Option<WayLayout> {
        let (a_first, a_last) = (a[0], a[a.len() - 1]);
        let (b_first, b_last) = (b[0], b[b.len() - 1]);

        if node == a_last && node == b_first && node != a_first && node != b_last {
            Some(WayLayout::EndStart)
        } else if node == b_last && node == a_first && node != b_first && node != a_last {
            Some(WayLayout::StartEnd)
        } else if node == a_last && node == b_last && node != a_first && node != b_first {
            Some(WayLayout::EndEnd)
        } else if node == a_first && node == b_first && node != a_last && node != b_last {
            Some(WayLayout::StartStart)
        } else if node == b_first && node != b_last && a.contains(&node) {
            Some(WayLayout::TFromA)
        } else if node == b_last && node != b_first && a.contains(&node) {
            Some(WayLayout::TToA)
        } else if node == a_first && node != a_last && b.contains(&node) {
            Some(WayLayout::TFromB)
        } else if node == a_last && node != a_first && b.contains(&node) {
            Some(WayLayout::TToB)
        } else if a.contains(&node) && b.contains(&node) {
            Some(WayLayout::X)
        } else {
            None
        }
    }

    /// Can a vehicle go from `a` to `b`, given each way's direction? Only the way that ends at a
    /// T-junction constrains it; crossings never do.
    pub fn connection_possible(self, a: Oneway, b: Oneway) -> bool {
        use Oneway::{Backward, Forward};

        let a = a.normalized();
        let b = b.normalized();
        match self {
            WayLayout::StartStart => !(a == Forward || b == Backward),
            WayLayout::StartEnd => !(a == Forward || b == Forward),
            WayLayout::EndStart => !(a == Backward || b == Backward),
            WayLayout::EndEnd => !(a == Backward || b == Forward),
            WayLayout::TFromA => b != Backward,
            WayLayout::TToA => b != Forward,
            WayLayout::TFromB => a != Forward,
            WayLayout::TToB => a != Backward,
            WayLayout::X => true,
        }
    }

    /// The layout seen when the movement is traversed the other way around: both ways flipped
    /// and their roles exchanged. `connection_possible(l, a, b)` always matches
    /// `connection_possible(l.reverse(), b, a)`.
    pub fn reverse(self) -> WayLayout {
        match self {
            WayLayout::StartStart => WayLayout::EndEnd,
            WayLayout::EndEnd => WayLayout::StartStart,
            WayLayout::StartEnd => WayLayout::StartEnd,
            WayLayout::EndStart => WayLayout::EndStart,
            WayLayout::TFromA => WayLayout::TToB,
            WayLayout::TToB => WayLayout::TFromA,
            WayLayout::TToA => WayLayout::TFromB,
            WayLayout::TFromB => WayLayout::TToA,
            WayLayout::X => WayLayout::X,
        }
    }

    /// The same geometry with `a` and `b` relabeled.
    pub fn swapped(self) -> WayLayout {
        match self {
            WayLayout::StartEnd => WayLayout::EndStart,
            WayLayout::EndStart => WayLayout::StartEnd,
            WayLayout::TFromA => WayLayout::TFromB,
            WayLayout::TFromB => WayLayout::TFromA,
            WayLayout::TToA => WayLayout::TToB,
            WayLayout::TToB => WayLayout::TToA,
            x => x,
        }
    }

    /// Both ways only touch with an endpoint. Only these layouts can be merged.
    pub fn is_adjacent(self) -> bool {
        matches!(
            self,
            WayLayout::StartStart | WayLayout::StartEnd | WayLayout::EndStart | WayLayout::EndEnd
        )
    }

    /// Both ways point the same direction through the node.
    pub fn is_aligned(self) -> bool {
        matches!(self, WayLayout::StartEnd | WayLayout::EndStart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONEWAYS: [Oneway; 4] = [
        Oneway::No,
        Oneway::Forward,
        Oneway::Backward,
        Oneway::Reversible,
    ];

    fn ids(raw: &[i64]) -> Vec<NodeID> {
        raw.iter().map(|x| NodeID(*x)).collect()
    }

    #[test]
    fn classification() {
        let a = ids(&[1, 2, 3]);
        assert_eq!(
            WayLayout::classify(NodeID(3), &a, &ids(&[3, 4])),
            Some(WayLayout::EndStart)
        );
        assert_eq!(
            WayLayout::classify(NodeID(1), &a, &ids(&[0, 1])),
            Some(WayLayout::StartEnd)
        );
        assert_eq!(
            WayLayout::classify(NodeID(3), &a, &ids(&[4, 3])),
            Some(WayLayout::EndEnd)
        );
        assert_eq!(
            WayLayout::classify(NodeID(1), &a, &ids(&[1, 0])),
            Some(WayLayout::StartStart)
        );
        assert_eq!(
            WayLayout::classify(NodeID(2), &a, &ids(&[2, 5])),
            Some(WayLayout::TFromA)
        );
        assert_eq!(
            WayLayout::classify(NodeID(2), &a, &ids(&[5, 2])),
            Some(WayLayout::TToA)
        );
        assert_eq!(
            WayLayout::classify(NodeID(5), &ids(&[5, 6]), &ids(&[4, 5, 7])),
            Some(WayLayout::TFromB)
        );
        assert_eq!(
            WayLayout::classify(NodeID(5), &ids(&[6, 5]), &ids(&[4, 5, 7])),
            Some(WayLayout::TToB)
        );
        assert_eq!(
            WayLayout::classify(NodeID(2), &a, &ids(&[4, 2, 5])),
            Some(WayLayout::X)
        );
        assert_eq!(WayLayout::classify(NodeID(9), &a, &ids(&[4, 5])), None);
    }

    #[test]
    fn cyclic_ways_meet_themselves_as_a_crossing() {
        let a = ids(&[1, 2, 3, 1]);
        assert_eq!(WayLayout::classify(NodeID(1), &a, &a), Some(WayLayout::X));
    }

    #[test]
    fn classification_is_total_for_shared_nodes() {
        let ways = vec![
            ids(&[1, 2, 3]),
            ids(&[3, 2, 1]),
            ids(&[2, 4]),
            ids(&[4, 2]),
            ids(&[5, 2, 6]),
            ids(&[2, 7, 2]),
            ids(&[2, 8]),
        ];
        for a in &ways {
            for b in &ways {
                assert!(WayLayout::classify(NodeID(2), a, b).is_some());
            }
        }
    }

    #[test]
    fn swapping_relabels() {
        let a = ids(&[1, 2, 3]);
        let others = vec![ids(&[3, 4]), ids(&[0, 1]), ids(&[2, 5]), ids(&[5, 2]), ids(&[4, 2, 5])];
        for b in &others {
            for node in b {
                if let Some(layout) = WayLayout::classify(*node, &a, b) {
                    assert_eq!(
                        WayLayout::classify(*node, b, &a),
                        Some(layout.swapped()),
                        "{:?} {:?} at {}",
                        a,
                        b,
                        node
                    );
                }
            }
        }
    }

    #[test]
    fn connectivity_round_trip() {
        for layout in ALL_LAYOUTS.iter() {
            assert_eq!(layout.reverse().reverse(), *layout);
            for a in ONEWAYS.iter() {
                for b in ONEWAYS.iter() {
                    assert_eq!(
                        layout.connection_possible(*a, *b),
                        layout.reverse().connection_possible(*b, *a),
                        "{:?} {:?} {:?}",
                        layout,
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn reversible_behaves_like_two_way() {
        for layout in ALL_LAYOUTS.iter() {
            for other in ONEWAYS.iter() {
                assert_eq!(
                    layout.connection_possible(Oneway::Reversible, *other),
                    layout.connection_possible(Oneway::No, *other)
                );
            }
        }
    }

    #[test]
    fn oneway_end_to_start() {
        let l = WayLayout::EndStart;
        assert!(l.connection_possible(Oneway::Forward, Oneway::Forward));
        assert!(!l.connection_possible(Oneway::Backward, Oneway::No));
        assert!(!l.connection_possible(Oneway::No, Oneway::Backward));
        assert!(WayLayout::X.connection_possible(Oneway::Backward, Oneway::Backward));
    }
}
