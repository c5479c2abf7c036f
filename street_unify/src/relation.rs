use serde::{Deserialize, Serialize};

use crate::types::{NodeID, RelationID, WayID};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    NoRightTurn,
    NoLeftTurn,
    NoUTurn,
    NoStraightOn,
    OnlyRightTurn,
    OnlyLeftTurn,
    OnlyStraightOn,
    OnlyUTurn,
    NoEntry,
    NoExit,
}

impl Restriction {
    pub fn parse(value: &str) -> Option<Restriction> {
        Some(match value {
            "no_right_turn" => Restriction::NoRightTurn,
            "no_left_turn" => Restriction::NoLeftTurn,
            "no_u_turn" => Restriction::NoUTurn,
            "no_straight_on" => Restriction::NoStraightOn,
            "only_right_turn" => Restriction::OnlyRightTurn,
            "only_left_turn" => Restriction::OnlyLeftTurn,
            "only_straight_on" => Restriction::OnlyStraightOn,
            "only_u_turn" => Restriction::OnlyUTurn,
            "no_entry" => Restriction::NoEntry,
            "no_exit" => Restriction::NoExit,
            _ => {
                return None;
            }
        })
    }

    /// The listed `to` ways are forbidden.
    pub fn is_no_type(self) -> bool {
        !self.is_only_type()
    }

    /// Only the listed `to` ways are allowed.
    pub fn is_only_type(self) -> bool {
        matches!(
            self,
            Restriction::OnlyRightTurn
                | Restriction::OnlyLeftTurn
                | Restriction::OnlyStraightOn
                | Restriction::OnlyUTurn
        )
    }
}

/// What kind of members the `via` list holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViaType {
    Node,
    Way,
    Relation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionRelation {
    pub id: RelationID,
    pub restriction: Restriction,
    pub from: Vec<WayID>,
    pub to: Vec<WayID>,
    /// Raw member IDs; interpret them using `via_type`.
    pub via: Vec<i64>,
    pub via_type: ViaType,
}

impl RestrictionRelation {
    /// The single via node, if this restriction is of the simple node-via form.
    pub fn via_node(&self) -> Option<NodeID> {
        if self.via_type == ViaType::Node && self.via.len() == 1 {
            Some(NodeID(self.via[0]))
        } else {
            None
        }
    }

    pub fn via_ways(&self) -> Vec<WayID> {
        if self.via_type == ViaType::Way {
            self.via.iter().map(|id| WayID(*id)).collect()
        } else {
            Vec::new()
        }
    }
}
