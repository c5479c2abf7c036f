use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::dataset::DataSet;
use crate::processor::{Context, Processor};
use crate::relation::{RestrictionRelation, ViaType};
use crate::street::{LaneInfo, MaxspeedInfo, Oneway, Speed, StreetComponent, StreetType};
use crate::types::{NodeID, RelationID, WayID};

/// Defaults used to fill in street attributes that weren't tagged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerValues {
    /// In km/h, used for `maxspeed=none`
    pub maximum_speed: f32,
    pub walking_speed: f32,
    /// For highway classes missing from `speed_per_highway`
    pub fallback_speed: f32,
    /// Per direction, for highway classes missing from `lanes_per_highway`
    pub fallback_lanes: i32,
    pub speed_per_highway: BTreeMap<String, f32>,
    pub lanes_per_highway: BTreeMap<String, i32>,
    /// Collapse every direction to at most one lane after deduction.
    pub single_lane_per_direction: bool,
}

impl Default for SanitizerValues {
    fn default() -> SanitizerValues {
        let mut speed_per_highway = BTreeMap::new();
        for (highway, speed) in &[
            ("motorway", 130.0),
            ("trunk", 100.0),
            ("primary", 100.0),
            ("secondary", 100.0),
            ("tertiary", 100.0),
            ("unclassified", 50.0),
            ("residential", 50.0),
            ("road", 50.0),
            ("service", 30.0),
            ("living_street", 7.0),
        ] {
            speed_per_highway.insert(highway.to_string(), *speed);
        }
        let mut lanes_per_highway = BTreeMap::new();
        lanes_per_highway.insert("motorway".to_string(), 2);
        lanes_per_highway.insert("trunk".to_string(), 2);

        SanitizerValues {
            maximum_speed: 130.0,
            walking_speed: 4.0,
            fallback_speed: 50.0,
            fallback_lanes: 1,
            speed_per_highway,
            lanes_per_highway,
            single_lane_per_direction: true,
        }
    }
}

impl SanitizerValues {
    pub fn speed_for(&self, highway: &str) -> f32 {
        self.speed_per_highway
            .get(highway)
            .cloned()
            .unwrap_or(self.fallback_speed)
    }

    pub fn lanes_for(&self, highway: &str) -> i32 {
        self.lanes_per_highway
            .get(highway)
            .cloned()
            .unwrap_or(self.fallback_lanes)
    }
}

/// Cleans up the raw dataset before unification: degenerate ways, street attributes, and invalid
/// turn restrictions. Sanitizer components are stripped afterwards.
pub struct DataSetSanitizer {
    values: SanitizerValues,
}

impl DataSetSanitizer {
    pub fn new(values: SanitizerValues) -> DataSetSanitizer {
        DataSetSanitizer { values }
    }

    fn sanitize_ways(&self, ds: &mut DataSet) -> usize {
        for way in ds.ways.values_mut() {
            way.nodes.dedup();
            if let (Some(street), Some(sanitizer)) = (way.street.as_mut(), way.sanitizer.as_ref()) {
                sanitize_street(&self.values, way.id, street, &sanitizer.highway);
            }
        }

        let degenerate: Vec<WayID> = ds
            .ways
            .values()
            .filter(|w| w.nodes.len() < 2)
            .map(|w| w.id)
            .collect();
        for id in &degenerate {
            ds.ways.remove(id);
        }
        degenerate.len()
    }
}

impl Processor for DataSetSanitizer {
    fn execute(&mut self, ctx: &mut Context, ds: &mut DataSet) -> Result<()> {
        ctx.timer.start("sanitize dataset");

        let degenerate = self.sanitize_ways(ds);
        if degenerate > 0 {
            ctx.timer
                .note(format!("Removed {} ways with fewer than 2 nodes", degenerate));
        }

        let invalid: Vec<RelationID> = ds
            .restrictions
            .values()
            .filter(|r| !is_valid_restriction(ds, r))
            .map(|r| r.id)
            .collect();
        for id in &invalid {
            ds.restrictions.remove(id);
        }
        if !invalid.is_empty() {
            ctx.timer
                .note(format!("Removed {} invalid turn restrictions", invalid.len()));
        }

        for way in ds.ways.values_mut() {
            way.sanitizer = None;
        }

        debug!(
            "After sanitizing: {} nodes, {} ways, {} restrictions",
            ds.nodes.len(),
            ds.ways.len(),
            ds.restrictions.len()
        );
        ctx.timer.stop("sanitize dataset");
        Ok(())
    }
}

fn sanitize_street(values: &SanitizerValues, id: WayID, street: &mut StreetComponent, highway: &str) {
    if street.street_type.is_none() {
        street.street_type = Some(StreetType::parse(highway).unwrap_or(StreetType::Road));
    }
    street.maxspeed = sanitize_maxspeed(values, street.maxspeed, street.oneway, highway);
    street.lanes = sanitize_lanes(values, id, street.lanes, street.oneway, highway);

    if values.single_lane_per_direction {
        let clamp = |x: Option<i32>| x.map(|x| x.min(1));
        street.lanes.forward = clamp(street.lanes.forward);
        street.lanes.backward = clamp(street.lanes.backward);
        street.lanes.sum = Some(street.lanes.forward.unwrap_or(0) + street.lanes.backward.unwrap_or(0));
    }
}

fn sanitize_maxspeed(
    values: &SanitizerValues,
    maxspeed: MaxspeedInfo,
    oneway: Oneway,
    highway: &str,
) -> MaxspeedInfo {
    let resolve = |speed: Speed| -> Speed {
        match speed {
            Speed::Kmh(x) => Speed::Kmh(x),
            Speed::Unlimited => Speed::Kmh(values.maximum_speed),
            Speed::Signals | Speed::Ungiven => Speed::Kmh(values.speed_for(highway)),
            Speed::Walk => Speed::Kmh(values.walking_speed),
        }
    };
    let forward = match oneway {
        Oneway::No | Oneway::Forward | Oneway::Reversible => resolve(maxspeed.forward),
        Oneway::Backward => Speed::Kmh(0.0),
    };
    let backward = match oneway {
        Oneway::No | Oneway::Backward => resolve(maxspeed.backward),
        Oneway::Forward | Oneway::Reversible => Speed::Kmh(0.0),
    };
    MaxspeedInfo::new(forward, backward)
}

/// Deduces whatever lane counts are missing from the ones given, repairing contradictions.
fn sanitize_lanes(
    values: &SanitizerValues,
    id: WayID,
    lanes: LaneInfo,
    oneway: Oneway,
    highway: &str,
) -> LaneInfo {
    let default = values.lanes_for(highway);
    let (forward, backward) = match oneway {
        Oneway::No => {
            let (mut forward, mut backward) = match (lanes.sum, lanes.forward, lanes.backward) {
                (None, None, None) => (default, default),
                (None, None, Some(b)) => {
                    warn!("{}: oneway=no but only lanes:backward given, using the default forward", id);
                    (default, b)
                }
                (None, Some(f), None) => {
                    warn!("{}: oneway=no but only lanes:forward given, using the default backward", id);
                    (f, default)
                }
                (None, Some(f), Some(b)) => (f, b),
                (Some(sum), None, None) => {
                    if sum == 1 {
                        (1, 1)
                    } else if sum % 2 == 0 {
                        (sum / 2, sum / 2)
                    } else {
                        warn!("{}: odd lanes={} without a direction split, adding one lane", id, sum);
                        ((sum + 1) / 2, (sum + 1) / 2)
                    }
                }
                (Some(sum), None, Some(b)) => {
                    let mut f = sum - b;
                    if f < 1 {
                        warn!("{}: lanes:forward deduced from lanes and lanes:backward is below 1, using the default", id);
                        f = default;
                    }
                    (f, b)
                }
                (Some(sum), Some(f), None) => {
                    let mut b = sum - f;
                    if b < 1 {
                        warn!("{}: lanes:backward deduced from lanes and lanes:forward is below 1, using the default", id);
                        b = default;
                    }
                    (f, b)
                }
                (Some(sum), Some(f), Some(b)) => {
                    if sum != 1 && sum < f + b {
                        warn!("{}: lanes is smaller than lanes:forward + lanes:backward, using their sum as the total", id);
                    }
                    (f, b)
                }
            };
            if forward == 0 {
                warn!("{}: lanes:forward=0 but oneway=no, assuming 1", id);
                forward = 1;
            }
            if backward == 0 {
                warn!("{}: lanes:backward=0 but oneway=no, assuming 1", id);
                backward = 1;
            }
            (forward, backward)
        }
        Oneway::Forward => (
            one_direction(id, lanes.sum, lanes.forward, lanes.backward, default, "oneway=yes"),
            0,
        ),
        Oneway::Backward => (
            0,
            one_direction(id, lanes.sum, lanes.backward, lanes.forward, default, "oneway=-1"),
        ),
        Oneway::Reversible => (
            lanes
                .forward
                .or(lanes.backward)
                .or(lanes.sum)
                .unwrap_or(default),
            0,
        ),
    };

    LaneInfo::new(forward + backward, forward, backward)
}

/// Lanes with the flow of a one-way street. Lanes against the flow are ignored.
fn one_direction(
    id: WayID,
    sum: Option<i32>,
    with: Option<i32>,
    against: Option<i32>,
    default: i32,
    tag: &str,
) -> i32 {
    if against.map(|x| x > 0).unwrap_or(false) {
        warn!("{}: lanes against the flow ignored on {}", id, tag);
    }
    match (sum, with) {
        (None, Some(x)) => x,
        (Some(x), None) => x,
        (None, None) => default,
        (Some(sum), Some(x)) => {
            if sum != x && against.map(|x| x > 0) != Some(true) {
                warn!("{}: lanes={} disagrees with the directional count on {}, using {}", id, sum, tag, x);
            }
            x
        }
    }
}

fn is_valid_restriction(ds: &DataSet, r: &RestrictionRelation) -> bool {
    if r.via_type == ViaType::Relation {
        return false;
    }
    if r.via.is_empty() || r.from.is_empty() || r.to.is_empty() {
        return false;
    }
    if r.via_type == ViaType::Node && r.via.len() > 1 {
        return false;
    }
    let all_exist = |ways: &[WayID]| ways.iter().all(|w| ds.ways.contains_key(w));
    if !all_exist(&r.from) || !all_exist(&r.to) {
        return false;
    }

    match r.via_type {
        ViaType::Node => {
            let via = NodeID(r.via[0]);
            if !ds.nodes.contains_key(&via) {
                return false;
            }
            r.from.iter().chain(r.to.iter()).all(|w| ds.ways[w].contains_node(via))
        }
        ViaType::Way => {
            let via = r.via_ways();
            if !all_exist(&via) {
                return false;
            }
            // Loosely adjacent: sharing any node with some via way
            let touches_via = |w: &WayID| {
                via.iter()
                    .any(|v| ds.ways[v].nodes.iter().any(|n| ds.ways[w].contains_node(*n)))
            };
            r.from.iter().chain(r.to.iter()).all(touches_via)
        }
        ViaType::Relation => false,
    }
}
