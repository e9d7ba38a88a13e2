//! The per-step cycle that drives the Shoal simulation.
//!
//! Each step runs through these phases:
//!
//! 1. **Housekeeping** -- remove schools that died last step, snapshot
//!    the cell map, and refresh the alive root view.
//! 2. **Processes** -- run each [`Process`] in order.
//! 3. **Output** -- refresh the output views, fill the histograms and
//!    stage table, and build the [`StepReport`].
//! 4. **Advance** -- move the clock to the next step.
//!
//! The cycle is deterministic given the same initial state and processes.

use shoal_output::{ClassHistogram, DistributionDefaults, OutputError, SchoolStage, StepReport};
use shoal_population::{
    Lifespans, Parent, Population, PopulationError, Predicate, SchoolFilter, ViewGraph,
};
use shoal_types::{CellId, DistributionType, ParameterLookup, School, Species, SpeciesId, ViewId};
use tracing::{debug, info};

use crate::clock::{ClockError, StepClock};
use crate::process::{Process, ProcessError, ProcessOutcome};

/// Errors that can occur during step execution.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A view operation failed.
    #[error("view error: {source}")]
    Population {
        /// The underlying view or store error.
        #[from]
        source: PopulationError,
    },

    /// Building the step output failed.
    #[error("output error: {source}")]
    Output {
        /// The underlying output error.
        #[from]
        source: OutputError,
    },

    /// A process failed.
    #[error("process {process} failed: {source}")]
    Process {
        /// Name of the failing process.
        process: &'static str,
        /// The underlying process error.
        source: ProcessError,
    },
}

/// Summary of a single step's execution.
#[derive(Debug, Clone)]
pub struct StepSummary {
    /// The step number that was executed.
    pub step: u64,
    /// Year containing the step.
    pub year: u64,
    /// Schools removed as dead at the start of the step.
    pub removed_dead: usize,
    /// Alive schools at the end of the step.
    pub alive_schools: usize,
    /// Alive schools inside the domain at the end of the step.
    pub present_schools: usize,
    /// Alive schools outside the domain at the end of the step.
    pub out_schools: usize,
    /// Alive schools per species at the end of the step, in species order.
    pub alive_by_species: Vec<(SpeciesId, usize)>,
    /// Cells holding at least one school at the start of the step.
    pub occupied_cells: usize,
    /// Cell holding the most schools at the start of the step.
    pub densest_cell: Option<(CellId, usize)>,
    /// What each process did, in run order.
    pub processes: Vec<ProcessOutcome>,
    /// The step report, when output is enabled.
    pub report: Option<StepReport>,
}

/// Keeps schools at least `min_steps` old.
#[derive(Debug, Clone, Copy)]
struct AgeCutoff {
    min_steps: u32,
}

impl SchoolFilter for AgeCutoff {
    fn accept(&self, school: &School) -> bool {
        school.age_steps >= self.min_steps
    }
}

/// Output view and the histograms filled from it each step.
#[derive(Debug, Clone)]
struct OutputViews {
    view: ViewId,
    histograms: Vec<ClassHistogram>,
}

/// Complete mutable state of a running simulation.
#[derive(Debug)]
pub struct SimulationState {
    /// The step clock.
    pub clock: StepClock,
    /// Declared species, in index order.
    pub species: Vec<Species>,
    /// Species lifespans in steps.
    pub lifespans: Lifespans,
    /// The root school store.
    pub population: Population,
    /// Views derived from the population.
    pub views: ViewGraph,
    alive_view: ViewId,
    output: Option<OutputViews>,
    stages: Option<SchoolStage>,
}

impl SimulationState {
    /// Assemble a state and register the alive root view.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Population`] if the alive view cannot be
    /// registered.
    pub fn new(
        clock: StepClock,
        species: Vec<Species>,
        population: Population,
    ) -> Result<Self, StepError> {
        let lifespans = Lifespans::from_species(&species, clock.steps_per_year());
        let mut views = ViewGraph::new();
        let alive_view = views.create(Some(Parent::Root), vec![Predicate::Alive], None)?;
        views.refresh(alive_view, &population)?;
        Ok(Self {
            clock,
            species,
            lifespans,
            population,
            views,
            alive_view,
            output: None,
            stages: None,
        })
    }

    /// Enable step reports.
    ///
    /// Reports cover alive schools inside the domain that are at least
    /// `cutoff_age_years` old, with one histogram per distribution kind.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Output`] if a distribution cannot be built
    /// from `parameters`.
    pub fn with_output(
        mut self,
        parameters: &dyn ParameterLookup,
        cutoff_age_years: u32,
    ) -> Result<Self, StepError> {
        let mut predicates = vec![Predicate::Present];
        let min_steps = cutoff_age_years.saturating_mul(self.clock.steps_per_year());
        if min_steps > 0 {
            predicates.push(Predicate::custom(AgeCutoff { min_steps }));
        }
        let view = self
            .views
            .create(Some(Parent::View(self.alive_view)), predicates, None)?;

        let defaults = DistributionDefaults::default();
        let histograms = DistributionType::ALL
            .iter()
            .map(|&kind| ClassHistogram::init(kind, &self.species, parameters, &defaults))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(view = %view, min_steps, histograms = histograms.len(), "Output views registered");
        self.output = Some(OutputViews { view, histograms });
        Ok(self)
    }

    /// Count reported schools per stage under `key`.
    ///
    /// The stage table is attached to each step report; it has no effect
    /// while output is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Output`] if the stage thresholds or structure
    /// under `key` cannot be read.
    pub fn with_stages(
        mut self,
        key: &str,
        parameters: &dyn ParameterLookup,
    ) -> Result<Self, StepError> {
        let stages = SchoolStage::init(key, &self.species, parameters)?;
        debug!(key, columns = stages.column_count(), "Stage table registered");
        self.stages = Some(stages);
        Ok(self)
    }

    /// Handle of the view holding every alive school.
    pub const fn alive_view(&self) -> ViewId {
        self.alive_view
    }

    /// Handle of the reported view, when output is enabled.
    pub fn output_view(&self) -> Option<ViewId> {
        self.output.as_ref().map(|output| output.view)
    }

    /// Number of alive schools as of the last refresh of the alive view.
    pub fn alive_count(&self) -> usize {
        self.views
            .view(self.alive_view)
            .map(|view| view.members().len())
            .unwrap_or(0)
    }
}

/// Execute one complete step of the simulation.
///
/// # Errors
///
/// Returns [`StepError`] if a view is missing, a process fails, the
/// report cannot be built, or the clock overflows.
pub fn run_step(
    state: &mut SimulationState,
    processes: &mut [Box<dyn Process>],
) -> Result<StepSummary, StepError> {
    let step = state.clock.step();
    let year = state.clock.year();
    let alive = state.alive_view;

    // --- Phase 1: Housekeeping ---
    let removed_dead = state.population.remove_dead().len();
    state.population.update_school_map();
    let occupied_cells = state.population.occupied_cells().count();
    let densest_cell = densest_cell_of(&state.population);
    let alive_at_start = state.views.refresh(alive, &state.population)?;
    info!(step, year, alive = alive_at_start, removed_dead, occupied_cells, "Step started");

    // --- Phase 2: Processes ---
    let mut outcomes = Vec::with_capacity(processes.len());
    for process in processes.iter_mut() {
        let outcome = process.apply(state).map_err(|source| StepError::Process {
            process: process.name(),
            source,
        })?;
        debug!(step, process = outcome.process, affected = outcome.affected, "Process applied");
        outcomes.push(outcome);
    }

    // --- Phase 3: Output ---
    let alive_schools = state.views.refresh(alive, &state.population)?;
    let steps_per_year = state.clock.steps_per_year();
    let report = match state.output.as_mut() {
        Some(output) => {
            state.views.refresh(output.view, &state.population)?;
            for histogram in &mut output.histograms {
                histogram.reset();
                histogram.record_view(&state.views, output.view, &state.population, steps_per_year)?;
            }
            let schools = state.views.schools(alive, &state.population)?;
            let report = StepReport::build(
                step,
                steps_per_year,
                &state.species,
                schools,
                output.histograms.clone(),
            );
            match state.stages.as_ref() {
                Some(stages) => {
                    let reported = state.views.schools(output.view, &state.population)?;
                    Some(report.with_stages(stages.tabulate(&state.species, reported, steps_per_year)))
                }
                None => Some(report),
            }
        }
        None => None,
    };
    let present_schools = state.population.present_schools().len();
    let out_schools = state.population.out_schools().len();
    let alive_by_species = state
        .species
        .iter()
        .map(|sp| (sp.id, state.population.schools_of_species(sp.id, true).len()))
        .collect();

    // --- Phase 4: Advance ---
    state.clock.advance()?;

    info!(step, alive = alive_schools, present = present_schools, out = out_schools, "Step completed");
    Ok(StepSummary {
        step,
        year,
        removed_dead,
        alive_schools,
        present_schools,
        out_schools,
        alive_by_species,
        occupied_cells,
        densest_cell,
        processes: outcomes,
        report,
    })
}

/// Occupied cell with the most schools, lowest cell id on ties.
fn densest_cell_of(population: &Population) -> Option<(CellId, usize)> {
    population
        .occupied_cells()
        .map(|cell| (cell, population.schools_in_cell(cell).len()))
        .fold(None, |best, (cell, count)| match best {
            Some((_, most)) if most >= count => best,
            _ => Some((cell, count)),
        })
}
