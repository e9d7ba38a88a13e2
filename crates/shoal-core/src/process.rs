//! Population processes run once per step, in order.
//!
//! A [`Process`] scopes its work through views derived from the alive
//! root view, so it only ever touches the schools it is meant to. The
//! built-in processes are:
//!
//! - [`Aging`] -- every alive school gets one step older.
//! - [`OldAgeMortality`] -- schools that reached their species lifespan die.
//! - [`OutOfDomainMortality`] -- alive schools outside the domain lose
//!   abundance at a per-species rate.

use std::collections::BTreeMap;

use shoal_population::{Parent, PopulationError, Predicate, subset};
use shoal_types::{ParameterError, ParameterLookup, Species, SpeciesId};
use tracing::debug;

use crate::step::SimulationState;

/// Abundance below which a school is considered extinct.
const EXTINCTION_ABUNDANCE: f64 = 1.0;

/// Errors a process can raise.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// A view operation failed.
    #[error("view error: {source}")]
    Population {
        /// The underlying view or store error.
        #[from]
        source: PopulationError,
    },
}

/// What a process did during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Name of the process.
    pub process: &'static str,
    /// Number of schools the process acted on.
    pub affected: usize,
}

/// A population process run once per step.
///
/// The alive root view is refreshed before the first process runs; it is
/// not refreshed between processes, so a school killed by one process is
/// still a member when the next one runs.
pub trait Process {
    /// Short name used in logs and summaries.
    fn name(&self) -> &'static str;

    /// Apply the process to the current state.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if a view it relies on is missing.
    fn apply(&mut self, state: &mut SimulationState) -> Result<ProcessOutcome, ProcessError>;
}

/// Increments the age of every alive school by one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aging;

impl Process for Aging {
    fn name(&self) -> &'static str {
        "aging"
    }

    fn apply(&mut self, state: &mut SimulationState) -> Result<ProcessOutcome, ProcessError> {
        let mut affected: usize = 0;
        let alive = state.alive_view();
        for &id in state.views.members(alive)? {
            if let Some(school) = state.population.get_mut(id) {
                school.age_steps = school.age_steps.saturating_add(1);
                affected = affected.saturating_add(1);
            }
        }
        Ok(ProcessOutcome {
            process: self.name(),
            affected,
        })
    }
}

/// Kills alive schools that reached their species lifespan.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldAgeMortality;

impl Process for OldAgeMortality {
    fn name(&self) -> &'static str {
        "old_age_mortality"
    }

    fn apply(&mut self, state: &mut SimulationState) -> Result<ProcessOutcome, ProcessError> {
        let alive = state.alive_view();
        let old = subset(
            &mut state.views,
            Parent::View(alive),
            vec![Predicate::ExceedsLifespan(state.lifespans.clone())],
            &state.population,
        )?;
        let doomed = state.views.members(old)?.to_vec();
        state.views.remove(old);

        for &id in &doomed {
            if let Some(school) = state.population.get_mut(id) {
                school.alive = false;
            }
        }
        debug!(step = state.clock.step(), deaths = doomed.len(), "Old-age mortality applied");
        Ok(ProcessOutcome {
            process: self.name(),
            affected: doomed.len(),
        })
    }
}

/// Removes abundance from alive schools outside the simulated domain.
///
/// Rates are annual instantaneous mortality rates read from
/// `mortality.out.rate.sp<i>`; a species without one loses nothing. Per
/// step, a school loses `abundance * (1 - exp(-rate / steps_per_year))`
/// individuals and dies once fewer than one individual is left.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutOfDomainMortality {
    rates: BTreeMap<SpeciesId, f64>,
}

impl OutOfDomainMortality {
    /// Read per-species rates for `species`.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] if a rate is present but unparsable.
    pub fn from_parameters(
        species: &[Species],
        parameters: &dyn ParameterLookup,
    ) -> Result<Self, ParameterError> {
        let mut rates = BTreeMap::new();
        for sp in species {
            let key = format!("mortality.out.rate.{}", sp.id.key_suffix());
            if !parameters.is_null(&key) {
                rates.insert(sp.id, parameters.get_double(&key)?);
            }
        }
        Ok(Self { rates })
    }

    /// Set the annual rate for one species.
    pub fn set_rate(&mut self, species: SpeciesId, annual_rate: f64) {
        self.rates.insert(species, annual_rate);
    }
}

impl Process for OutOfDomainMortality {
    fn name(&self) -> &'static str {
        "out_of_domain_mortality"
    }

    fn apply(&mut self, state: &mut SimulationState) -> Result<ProcessOutcome, ProcessError> {
        let alive = state.alive_view();
        let out = subset(
            &mut state.views,
            Parent::View(alive),
            vec![Predicate::OutOfDomain],
            &state.population,
        )?;
        let outside = state.views.members(out)?.to_vec();
        state.views.remove(out);

        let steps_per_year = f64::from(state.clock.steps_per_year());
        let mut removed = 0.0;
        let mut extinct: usize = 0;
        for &id in &outside {
            let Some(school) = state.population.get_mut(id) else {
                continue;
            };
            let rate = self.rates.get(&school.species).copied().unwrap_or(0.0) / steps_per_year;
            let dead = school.abundance * (1.0 - (-rate).exp());
            if dead > 0.0 {
                school.abundance -= dead;
                removed += dead;
            }
            if school.abundance < EXTINCTION_ABUNDANCE {
                school.alive = false;
                extinct = extinct.saturating_add(1);
            }
        }
        debug!(
            step = state.clock.step(),
            outside = outside.len(),
            removed,
            extinct,
            "Out-of-domain mortality applied"
        );
        Ok(ProcessOutcome {
            process: self.name(),
            affected: outside.len(),
        })
    }
}
