use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph_way::GraphWayComponent;
use crate::street::{SanitizerWayComponent, StreetComponent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeID(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WayID(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationID(pub i64);

/// Identifies a feature by the generator-index of the generator that produces it. A way is a
/// member of every feature in its `features` set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureID(pub i32);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}

impl fmt::Display for WayID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "way {}", self.0)
    }
}

impl fmt::Display for RelationID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "relation {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat { lon, lat }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeID,
    pub pt: LonLat,
}

impl Node {
    pub fn new(id: NodeID, pt: LonLat) -> Node {
        Node { id, pt }
    }
}

/// Plain key/value attributes carried along with a way. Two ways only merge if these match
/// exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, k: K, v: V) {
        self.0.insert(k.into(), v.into());
    }
}

/// The kinds of components a way may carry. Two ways can only merge or be considered doubled if
/// they carry exactly the same kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    Street,
    Graph,
    Sanitizer,
    Tags,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: WayID,
    /// At least 2 entries, no two consecutive entries equal
    pub nodes: Vec<NodeID>,
    pub features: BTreeSet<FeatureID>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<StreetComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphWayComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitizer: Option<SanitizerWayComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl Way {
    pub fn new(id: WayID, nodes: Vec<NodeID>) -> Way {
        Way {
            id,
            nodes,
            features: BTreeSet::new(),
            street: None,
            graph: None,
            sanitizer: None,
            tags: None,
        }
    }

    pub fn first_node(&self) -> NodeID {
        self.nodes[0]
    }

    pub fn last_node(&self) -> NodeID {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn is_endpoint(&self, node: NodeID) -> bool {
        self.first_node() == node || self.last_node() == node
    }

    /// The first and last node are the same.
    pub fn is_cyclic(&self) -> bool {
        self.first_node() == self.last_node()
    }

    pub fn contains_node(&self, node: NodeID) -> bool {
        self.nodes.contains(&node)
    }

    pub fn is_member_of(&self, feature: FeatureID) -> bool {
        self.features.contains(&feature)
    }

    pub fn component_kinds(&self) -> BTreeSet<ComponentKind> {
        let mut kinds = BTreeSet::new();
        if self.street.is_some() {
            kinds.insert(ComponentKind::Street);
        }
        if self.graph.is_some() {
            kinds.insert(ComponentKind::Graph);
        }
        if self.sanitizer.is_some() {
            kinds.insert(ComponentKind::Sanitizer);
        }
        if self.tags.is_some() {
            kinds.insert(ComponentKind::Tags);
        }
        kinds
    }

    /// Flips the order of nodes and every direction-dependent component.
    pub fn reverse(&mut self) {
        self.nodes.reverse();
        if let Some(ref mut street) = self.street {
            street.reverse();
        }
        if let Some(ref mut graph) = self.graph {
            graph.reverse();
        }
    }

    /// A copy of this way with a new ID and a slice of the nodes. The graph component starts empty;
    /// the caller is responsible for deriving its connectors.
    pub(crate) fn segment(&self, id: WayID, nodes: Vec<NodeID>) -> Way {
        Way {
            id,
            nodes,
            features: self.features.clone(),
            street: self.street.clone(),
            graph: self.graph.as_ref().map(|_| GraphWayComponent::new()),
            sanitizer: self.sanitizer.clone(),
            tags: self.tags.clone(),
        }
    }
}
