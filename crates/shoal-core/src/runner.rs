//! Bounded simulation loop.
//!
//! [`run_simulation`] repeats [`run_step`] until the step limit is reached
//! or no alive school remains, handing each [`StepSummary`] to a
//! [`StepCallback`].
//!
//! [`run_step`]: crate::step::run_step

use tracing::info;

use crate::process::Process;
use crate::step::{self, SimulationState, StepError, StepSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step execution failed.
    #[error("step error: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: StepError,
    },
}

/// Why a simulation run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// The configured number of steps completed.
    MaxStepsReached,
    /// No alive school remained at the end of a step.
    Extinction,
}

impl core::fmt::Display for SimulationEndReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MaxStepsReached => write!(f, "max_steps_reached"),
            Self::Extinction => write!(f, "extinction"),
        }
    }
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last step summary.
    pub final_summary: Option<StepSummary>,
    /// Total number of steps executed.
    pub total_steps: u64,
}

/// Callback invoked after each step completes.
pub trait StepCallback {
    /// Called after a step completes successfully.
    fn on_step(&mut self, summary: &StepSummary, state: &SimulationState);
}

/// A no-op step callback for testing.
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _summary: &StepSummary, _state: &SimulationState) {}
}

/// Run steps until `max_steps` have completed (0 = no limit) or the
/// population goes extinct.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step fails.
pub fn run_simulation(
    state: &mut SimulationState,
    processes: &mut [Box<dyn Process>],
    max_steps: u64,
    callback: &mut dyn StepCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut total_steps: u64 = 0;

    info!(
        max_steps,
        steps_per_year = state.clock.steps_per_year(),
        species = state.species.len(),
        schools = state.population.len(),
        processes = processes.len(),
        "Simulation starting"
    );

    loop {
        let summary = step::run_step(state, processes)?;
        total_steps = total_steps.saturating_add(1);

        callback.on_step(&summary, state);

        if summary.alive_schools == 0 {
            info!(step = summary.step, "No alive school left -- extinction");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::Extinction,
                final_summary: Some(summary),
                total_steps,
            });
        }

        if max_steps > 0 && total_steps >= max_steps {
            info!(step = summary.step, max_steps, "Step limit reached");
            return Ok(SimulationResult {
                end_reason: SimulationEndReason::MaxStepsReached,
                final_summary: Some(summary),
                total_steps,
            });
        }
    }
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = %result.end_reason,
        total_steps = result.total_steps,
        final_step = result.final_summary.as_ref().map(|s| s.step),
        final_alive = result.final_summary.as_ref().map(|s| s.alive_schools),
        "Simulation ended"
    );
}

#[cfg(test)]
mod tests {
    use shoal_population::Population;
    use shoal_types::{School, Species, SpeciesId};

    use super::*;
    use crate::clock::StepClock;
    use crate::process::{Aging, OldAgeMortality};

    /// Counts callback invocations.
    struct Counter {
        steps: Vec<u64>,
    }

    impl StepCallback for Counter {
        fn on_step(&mut self, summary: &StepSummary, _state: &SimulationState) {
            self.steps.push(summary.step);
        }
    }

    fn state(lifespan_years: f64, schools: usize) -> Option<SimulationState> {
        let species = vec![Species {
            id: SpeciesId(0),
            name: "sprat".to_owned(),
            lifespan_years,
        }];
        let mut population = Population::new();
        for _ in 0..schools {
            population.add(School::new(SpeciesId(0), 8.0, 10.0, 100.0)).ok()?;
        }
        let clock = StepClock::new(2).ok()?;
        SimulationState::new(clock, species, population).ok()
    }

    fn processes() -> Vec<Box<dyn Process>> {
        vec![Box::new(Aging), Box::new(OldAgeMortality)]
    }

    #[test]
    fn stops_at_max_steps() {
        let state = state(100.0, 3);
        assert!(state.is_some());
        let Some(mut state) = state else { return };
        let mut counter = Counter { steps: Vec::new() };

        let result = run_simulation(&mut state, &mut processes(), 5, &mut counter);
        assert!(result.is_ok());
        if let Ok(result) = result {
            assert_eq!(result.end_reason, SimulationEndReason::MaxStepsReached);
            assert_eq!(result.total_steps, 5);
            assert_eq!(result.final_summary.map(|s| s.step), Some(4));
        }
        assert_eq!(counter.steps, [0, 1, 2, 3, 4]);
        assert_eq!(state.clock.step(), 5);
    }

    #[test]
    fn stops_on_extinction() {
        // Two steps per year and a 2-year lifespan: schools die at age 4.
        let state = state(2.0, 2);
        assert!(state.is_some());
        let Some(mut state) = state else { return };

        let result = run_simulation(&mut state, &mut processes(), 100, &mut NoOpCallback);
        assert!(result.is_ok());
        if let Ok(result) = result {
            assert_eq!(result.end_reason, SimulationEndReason::Extinction);
            assert_eq!(result.total_steps, 4);
            assert_eq!(result.final_summary.map(|s| s.alive_schools), Some(0));
        }
    }

    #[test]
    fn unlimited_run_ends_by_extinction() {
        let state = state(1.0, 1);
        assert!(state.is_some());
        let Some(mut state) = state else { return };

        let result = run_simulation(&mut state, &mut processes(), 0, &mut NoOpCallback);
        assert!(result.is_ok_and(|r| r.end_reason == SimulationEndReason::Extinction && r.total_steps == 2));
    }

    #[test]
    fn empty_population_is_extinct_after_one_step() {
        let state = state(5.0, 0);
        assert!(state.is_some());
        let Some(mut state) = state else { return };

        let result = run_simulation(&mut state, &mut processes(), 10, &mut NoOpCallback);
        assert!(result.is_ok_and(|r| r.end_reason == SimulationEndReason::Extinction && r.total_steps == 1));
    }

    #[test]
    fn end_reason_display() {
        assert_eq!(SimulationEndReason::MaxStepsReached.to_string(), "max_steps_reached");
        assert_eq!(SimulationEndReason::Extinction.to_string(), "extinction");
    }
}
