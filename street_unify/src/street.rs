use serde::{Deserialize, Serialize};

/// Corresponds to the OSM `highway` tag, plus roundabouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreetType {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Unclassified,
    Residential,
    Service,
    Roundabout,

    MotorwayLink,
    TrunkLink,
    PrimaryLink,
    SecondaryLink,
    TertiaryLink,

    LivingStreet,
    Track,
    Road,
}

impl StreetType {
    pub fn parse(highway: &str) -> Option<StreetType> {
        Some(match highway {
            "motorway" => StreetType::Motorway,
            "trunk" => StreetType::Trunk,
            "primary" => StreetType::Primary,
            "secondary" => StreetType::Secondary,
            "tertiary" => StreetType::Tertiary,
            "unclassified" => StreetType::Unclassified,
            "residential" => StreetType::Residential,
            "service" => StreetType::Service,
            "motorway_link" => StreetType::MotorwayLink,
            "trunk_link" => StreetType::TrunkLink,
            "primary_link" => StreetType::PrimaryLink,
            "secondary_link" => StreetType::SecondaryLink,
            "tertiary_link" => StreetType::TertiaryLink,
            "living_street" => StreetType::LivingStreet,
            "track" => StreetType::Track,
            "road" => StreetType::Road,
            _ => {
                return None;
            }
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Oneway {
    No,
    /// Only in the direction the nodes are listed
    Forward,
    /// Only against the direction the nodes are listed
    Backward,
    /// Changes direction over time. For connectivity, this is treated like `No`.
    Reversible,
}

impl Oneway {
    pub fn parse(value: &str) -> Option<Oneway> {
        match value {
            "no" | "false" | "0" => Some(Oneway::No),
            "yes" | "true" | "1" => Some(Oneway::Forward),
            "-1" | "reverse" => Some(Oneway::Backward),
            "reversible" => Some(Oneway::Reversible),
            _ => None,
        }
    }

    pub fn normalized(self) -> Oneway {
        match self {
            Oneway::Reversible => Oneway::No,
            x => x,
        }
    }

    pub fn reversed(self) -> Oneway {
        match self {
            Oneway::Forward => Oneway::Backward,
            Oneway::Backward => Oneway::Forward,
            x => x,
        }
    }

    pub fn reverse_eq(self, other: Oneway) -> bool {
        self.reversed() == other
    }
}

/// Lane counts. `None` means the value wasn't given and still has to be deduced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneInfo {
    pub sum: Option<i32>,
    pub forward: Option<i32>,
    pub backward: Option<i32>,
}

impl LaneInfo {
    pub fn new(sum: i32, forward: i32, backward: i32) -> LaneInfo {
        LaneInfo {
            sum: Some(sum),
            forward: Some(forward),
            backward: Some(backward),
        }
    }

    pub fn ungiven() -> LaneInfo {
        LaneInfo::default()
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.forward, &mut self.backward);
    }

    pub fn reverse_eq(&self, other: &LaneInfo) -> bool {
        self.sum == other.sum && self.forward == other.backward && self.backward == other.forward
    }
}

/// A speed limit in one direction, in km/h once sanitized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Speed {
    Kmh(f32),
    /// `maxspeed=none`
    Unlimited,
    /// `maxspeed=signals`
    Signals,
    /// `maxspeed=walk`
    Walk,
    Ungiven,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaxspeedInfo {
    pub forward: Speed,
    pub backward: Speed,
}

impl MaxspeedInfo {
    pub fn new(forward: Speed, backward: Speed) -> MaxspeedInfo {
        MaxspeedInfo { forward, backward }
    }

    pub fn both(speed: Speed) -> MaxspeedInfo {
        MaxspeedInfo::new(speed, speed)
    }

    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.forward, &mut self.backward);
    }

    pub fn reverse_eq(&self, other: &MaxspeedInfo) -> bool {
        self.forward == other.backward && self.backward == other.forward
    }
}

/// The attributes of a way that matter for driving on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreetComponent {
    pub street_type: Option<StreetType>,
    pub lanes: LaneInfo,
    pub maxspeed: MaxspeedInfo,
    pub oneway: Oneway,
    pub layer: i32,
}

impl StreetComponent {
    pub fn new(street_type: StreetType, oneway: Oneway) -> StreetComponent {
        StreetComponent {
            street_type: Some(street_type),
            lanes: LaneInfo::ungiven(),
            maxspeed: MaxspeedInfo::both(Speed::Ungiven),
            oneway,
            layer: 0,
        }
    }

    /// Equal after flipping one side around.
    pub fn reverse_eq(&self, other: &StreetComponent) -> bool {
        self.street_type == other.street_type
            && self.lanes.reverse_eq(&other.lanes)
            && self.maxspeed.reverse_eq(&other.maxspeed)
            && self.oneway.reverse_eq(other.oneway)
            && self.layer == other.layer
    }

    pub fn reverse(&mut self) {
        self.oneway = self.oneway.reversed();
        self.maxspeed.reverse();
        self.lanes.reverse();
    }
}

/// Raw input only needed while cleaning up street attributes. It's stripped before unification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizerWayComponent {
    pub highway: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversing_flips_direction_dependent_attributes() {
        let mut a = StreetComponent::new(StreetType::Residential, Oneway::Forward);
        a.lanes = LaneInfo::new(3, 2, 1);
        a.maxspeed = MaxspeedInfo::new(Speed::Kmh(50.0), Speed::Kmh(30.0));
        let orig = a.clone();

        a.reverse();
        assert_eq!(a.oneway, Oneway::Backward);
        assert_eq!(a.lanes, LaneInfo::new(3, 1, 2));
        assert_eq!(a.maxspeed.forward, Speed::Kmh(30.0));
        assert!(a.reverse_eq(&orig));
        assert!(orig.reverse_eq(&a));
        assert_ne!(a, orig);

        a.reverse();
        assert_eq!(a, orig);
    }

    #[test]
    fn reversible_is_its_own_reverse() {
        assert_eq!(Oneway::Reversible.reversed(), Oneway::Reversible);
        assert_eq!(Oneway::Reversible.normalized(), Oneway::No);
        assert!(Oneway::No.reverse_eq(Oneway::No));
        assert!(!Oneway::No.reverse_eq(Oneway::Forward));
    }

    #[test]
    fn parsing() {
        assert_eq!(Oneway::parse("yes"), Some(Oneway::Forward));
        assert_eq!(Oneway::parse("-1"), Some(Oneway::Backward));
        assert_eq!(Oneway::parse("sometimes"), None);
        assert_eq!(StreetType::parse("living_street"), Some(StreetType::LivingStreet));
        assert_eq!(StreetType::parse("footway"), None);
    }
}
