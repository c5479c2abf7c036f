//! Small helpers shared by the street-graph crates: deterministic multisets and multimaps, a
//! hierarchical phase timer that collects warnings, logger setup, and JSON IO.

mod collections;
mod io;
pub mod logger;
mod time;

pub use crate::collections::{Counter, MultiMap};
pub use crate::io::{read_json, to_json, write_json};
pub use crate::time::{prettyprint_usize, Timer};

