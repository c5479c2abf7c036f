//! Pluggable cleanup passes that run before and during unification.

mod dataset;
mod street_graph;

pub use self::dataset::{DataSetSanitizer, SanitizerValues};
pub use self::street_graph::{DoubledWays, StreetGraphSanitizer};
