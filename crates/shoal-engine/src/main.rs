//! Engine binary for the Shoal simulation.
//!
//! Wires together configuration, the seed population, the population
//! processes, and the step loop, then writes one JSON report line per
//! step.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `SHOAL_CONFIG` or `shoal-config.yaml`
//! 2. Initialize structured logging (tracing) at the configured level
//! 3. Read the species table from the parameters
//! 4. Spawn the seed population
//! 5. Assemble the simulation state and processes
//! 6. Run the step loop, writing reports
//! 7. Log the result

mod error;
mod report_writer;
mod spawner;

use std::path::PathBuf;

use anyhow::Context;
use shoal_core::clock::StepClock;
use shoal_core::config::{SimulationConfig, species_from_parameters};
use shoal_core::process::{Aging, OldAgeMortality, OutOfDomainMortality, Process};
use shoal_core::runner::{self, NoOpCallback};
use shoal_core::step::SimulationState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::report_writer::JsonlReportWriter;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "SHOAL_CONFIG";

/// Configuration file used when `SHOAL_CONFIG` is unset.
const DEFAULT_CONFIG_FILE: &str = "shoal-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself
/// fails.
fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config = load_config().context("loading configuration")?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("shoal-engine starting");
    info!(
        name = config.simulation.name,
        seed = config.simulation.seed,
        max_steps = config.simulation.max_steps,
        steps_per_year = config.simulation.steps_per_year,
        "Configuration loaded"
    );

    run(&config).context("running simulation")?;
    info!("shoal-engine shutdown complete");
    Ok(())
}

fn run(config: &SimulationConfig) -> Result<(), EngineError> {
    // 3. Species table.
    let parameters = config.parameters();
    let species = species_from_parameters(&parameters)?;
    if species.is_empty() {
        return Err(EngineError::NoSpecies);
    }
    info!(species = species.len(), parameters = parameters.len(), "Species declared");

    // 4. Seed population.
    let steps_per_year = config.simulation.steps_per_year;
    let population = spawner::spawn_population(
        &config.population,
        &species,
        &parameters,
        steps_per_year,
        config.simulation.seed,
    )?;

    // 5. State and processes.
    let clock = StepClock::from_config(&config.simulation)?;
    let out_mortality = OutOfDomainMortality::from_parameters(&species, &parameters)?;
    let mut state = SimulationState::new(clock, species, population)?;
    if config.output.enabled {
        state = state.with_output(&parameters, config.output.cutoff_age_years)?;
        if let Some(key) = &config.output.stage_key {
            state = state.with_stages(key, &parameters)?;
        }
    }
    let mut processes: Vec<Box<dyn Process>> =
        vec![Box::new(Aging), Box::new(OldAgeMortality), Box::new(out_mortality)];

    // 6. Run.
    let max_steps = config.simulation.max_steps;
    if config.output.enabled {
        let (mut writer, path) = JsonlReportWriter::create(&config.output.directory)?;
        info!(path = %path.display(), "Writing step reports");
        let result = runner::run_simulation(&mut state, &mut processes, max_steps, &mut writer)?;
        let (_, lines) = writer.finish()?;
        info!(path = %path.display(), lines, "Step reports written");
        runner::log_simulation_end(&result);
    } else {
        let result = runner::run_simulation(&mut state, &mut processes, max_steps, &mut NoOpCallback)?;
        runner::log_simulation_end(&result);
    }
    Ok(())
}

/// Load the configuration from `SHOAL_CONFIG`, else `shoal-config.yaml`
/// in the working directory, else the defaults.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let explicit = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let path = explicit.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if explicit.is_some() || path.exists() {
        Ok(SimulationConfig::from_file(&path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.output.apply_env_overrides();
        Ok(config)
    }
}
