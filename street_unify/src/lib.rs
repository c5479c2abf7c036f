//! Turns a raw street network into a unified street graph. Ways are split wherever they meet, so
//! every junction is a way endpoint, turn restrictions are folded into explicit connectors between
//! ways, and then ways are merged back together wherever nothing observable would change.
//!
//! The entry point is `OsmProcessor::execute`.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod connector;
mod dataset;
mod degree;
mod features;
pub mod graph_way;
mod layout;
mod processor;
mod relation;
mod restrictions;
mod sanitize;
mod street;
mod types;
pub mod ways;

pub use self::connector::{connect, Connector};
pub use self::dataset::{check_connector_symmetry, DataSet, SequentialWayIds, WayIdGenerator};
pub use self::degree::NodeDegrees;
pub use self::features::{FeatureDefinition, FeatureGenerator, FeatureSystem, GeneratorRegistry};
pub use self::graph_way::GraphWayComponent;
pub use self::layout::{WayLayout, ALL_LAYOUTS};
pub use self::processor::{Context, OsmProcessor, Processor, UnifyConfig};
pub use self::relation::{Restriction, RestrictionRelation, ViaType};
pub use self::restrictions::apply_restrictions;
pub use self::sanitize::{DataSetSanitizer, DoubledWays, SanitizerValues, StreetGraphSanitizer};
pub use self::street::{
    LaneInfo, MaxspeedInfo, Oneway, SanitizerWayComponent, Speed, StreetComponent, StreetType,
};
pub use self::types::{
    ComponentKind, FeatureID, LonLat, Node, NodeID, RelationID, Tags, Way, WayID,
};
