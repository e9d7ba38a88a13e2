//! Seed population generation.
//!
//! At simulation start the spawner creates a fixed number of schools per
//! species with random length and age, drawn from a seeded generator so
//! that two runs with the same seed start from the same population.
//! In-domain schools are spread uniformly over `grid_cells` cells;
//! schools outside the domain stay unlocated.
//!
//! Weight follows the allometric relation `W = c * L^b` with per-species
//! `species.length2weight.condition.factor.sp<i>` (`c`, default 0.006)
//! and `species.length2weight.allometric.power.sp<i>` (`b`, default 3).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shoal_core::config::PopulationConfig;
use shoal_population::Population;
use shoal_types::{CellId, ParameterError, ParameterLookup, School, Species};
use tracing::{debug, info};

use crate::error::EngineError;

const DEFAULT_CONDITION_FACTOR: f64 = 0.006;
const DEFAULT_ALLOMETRIC_POWER: f64 = 3.0;

/// Length-to-weight coefficients of one species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthWeight {
    /// Condition factor `c`.
    pub condition_factor: f64,
    /// Allometric power `b`.
    pub allometric_power: f64,
}

impl LengthWeight {
    /// Read the coefficients of `species`, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] if a coefficient is present but
    /// unparsable.
    pub fn from_parameters(
        species: &Species,
        parameters: &dyn ParameterLookup,
    ) -> Result<Self, ParameterError> {
        let suffix = species.id.key_suffix();
        Ok(Self {
            condition_factor: double_or(
                parameters,
                &format!("species.length2weight.condition.factor.{suffix}"),
                DEFAULT_CONDITION_FACTOR,
            )?,
            allometric_power: double_or(
                parameters,
                &format!("species.length2weight.allometric.power.{suffix}"),
                DEFAULT_ALLOMETRIC_POWER,
            )?,
        })
    }

    /// Individual weight in grams at `length` centimeters.
    pub fn weight(&self, length: f64) -> f64 {
        self.condition_factor * length.powf(self.allometric_power)
    }
}

fn double_or(
    parameters: &dyn ParameterLookup,
    key: &str,
    default: f64,
) -> Result<f64, ParameterError> {
    if parameters.is_null(key) {
        Ok(default)
    } else {
        parameters.get_double(key)
    }
}

/// Spawn the seed population.
///
/// Each species receives `initial_schools_per_species` schools with a
/// length drawn uniformly from `initial_length_cm` and an age drawn
/// uniformly below half the species lifespan. A fraction
/// `out_of_domain_fraction` of the schools starts outside the domain.
///
/// # Errors
///
/// Returns [`EngineError::Parameter`] if length-weight coefficients are
/// malformed.
pub fn spawn_population(
    config: &PopulationConfig,
    species: &[Species],
    parameters: &dyn ParameterLookup,
    steps_per_year: u32,
    seed: u64,
) -> Result<Population, EngineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut population = Population::new();
    let [min_length, max_length] = config.initial_length_cm;

    for sp in species {
        let allometry = LengthWeight::from_parameters(sp, parameters)?;
        let max_age = sp.lifespan_steps(steps_per_year).checked_div(2).unwrap_or(0).max(1);

        for _ in 0..config.initial_schools_per_species {
            let length = rng.random_range(min_length..=max_length);
            let mut school = School::new(sp.id, length, allometry.weight(length), config.initial_abundance);
            school.age_steps = rng.random_range(0..max_age);
            school.in_domain = !rng.random_bool(config.out_of_domain_fraction);
            if school.in_domain && config.grid_cells > 0 {
                school.cell = Some(CellId(rng.random_range(0..config.grid_cells)));
            }
            population.add(school)?;
        }
        debug!(species = %sp.id, name = sp.name, schools = config.initial_schools_per_species, "Species spawned");
    }

    info!(schools = population.len(), seed, "Seed population spawned");
    Ok(population)
}
