use anyhow::{Context, Result};

use streetutil::Timer;

use crate::dataset::DataSet;
use crate::types::FeatureID;

/// Produces or updates one feature of the dataset, like deriving attributes from tags. Runs before
/// or after unification depending on its generator-index.
pub trait FeatureGenerator {
    fn generate(&mut self, ds: &mut DataSet, feature: FeatureID, timer: &mut Timer) -> Result<()>;
}

impl<F> FeatureGenerator for F
where
    F: FnMut(&mut DataSet, FeatureID, &mut Timer) -> Result<()>,
{
    fn generate(&mut self, ds: &mut DataSet, feature: FeatureID, timer: &mut Timer) -> Result<()> {
        self(ds, feature, timer)
    }
}

/// Runs every registered generator whose index falls in an inclusive range.
pub trait FeatureSystem {
    fn generate_all_features(
        &mut self,
        ds: &mut DataSet,
        idx_low: i32,
        idx_high: i32,
        timer: &mut Timer,
    ) -> Result<()>;
}

pub struct FeatureDefinition {
    pub name: String,
    pub generator_index: i32,
    pub generator: Box<dyn FeatureGenerator>,
}

/// Keeps definitions ordered by generator-index. Definitions sharing an index run in the order
/// they were registered.
#[derive(Default)]
pub struct GeneratorRegistry {
    definitions: Vec<FeatureDefinition>,
}

impl GeneratorRegistry {
    pub fn new() -> GeneratorRegistry {
        GeneratorRegistry::default()
    }

    pub fn register<G: FeatureGenerator + 'static>(
        &mut self,
        name: &str,
        generator_index: i32,
        generator: G,
    ) {
        self.definitions.push(FeatureDefinition {
            name: name.to_string(),
            generator_index,
            generator: Box::new(generator),
        });
        // Stable, so ties keep registration order
        self.definitions.sort_by_key(|d| d.generator_index);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }
}

impl FeatureSystem for GeneratorRegistry {
    fn generate_all_features(
        &mut self,
        ds: &mut DataSet,
        idx_low: i32,
        idx_high: i32,
        timer: &mut Timer,
    ) -> Result<()> {
        for def in &mut self.definitions {
            if def.generator_index < idx_low || def.generator_index > idx_high {
                continue;
            }
            let feature = FeatureID(def.generator_index);
            timer.start(&def.name);
            def.generator
                .generate(ds, feature, timer)
                .with_context(|| format!("generating feature {}", def.name))?;
            timer.stop(&def.name);
        }
        Ok(())
    }
}
