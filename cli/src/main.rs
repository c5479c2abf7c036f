//! Unifies the street graph of a JSON dataset and writes the result as JSON.

#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use structopt::StructOpt;

use street_unify::{
    check_connector_symmetry, DataSet, GeneratorRegistry, OsmProcessor, SequentialWayIds,
    UnifyConfig,
};
use streetutil::{prettyprint_usize, Timer};

#[derive(StructOpt)]
#[structopt(
    name = "unify_streets",
    about = "Splits, cleans up and merges the ways of a street network"
)]
struct Args {
    /// The dataset to unify, as JSON
    #[structopt(long)]
    input: String,
    /// Where to write the unified dataset
    #[structopt(long)]
    output: String,
    /// Optional JSON file overriding feature indices and sanitizer defaults
    #[structopt(long)]
    config: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::from_args();
    streetutil::logger::setup();

    let config: UnifyConfig = match args.config {
        Some(ref path) => streetutil::read_json(path)
            .with_context(|| format!("loading config from {}", path))?,
        None => UnifyConfig::default(),
    };

    let mut timer = Timer::new(&format!("unify {}", args.input));
    timer.start("load dataset");
    let mut dataset: DataSet = streetutil::read_json(&args.input)?;
    timer.stop("load dataset");

    let ids = SequentialWayIds::after(&dataset);
    let mut processor =
        OsmProcessor::new(config, Box::new(GeneratorRegistry::new()), Box::new(ids))?;
    processor.execute(&mut dataset, &mut timer)?;
    check_connector_symmetry(&dataset).context("unified dataset is inconsistent")?;

    streetutil::write_json(&args.output, &dataset)?;
    info!("Done with {}", args.output);
    println!(
        "{} nodes, {} ways, {} connectors",
        prettyprint_usize(dataset.nodes.len()),
        prettyprint_usize(dataset.ways.len()),
        prettyprint_usize(dataset.connector_count())
    );
    Ok(())
}
