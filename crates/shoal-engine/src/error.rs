//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during engine startup and
//! simulation execution.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: shoal_core::config::ConfigError,
    },

    /// A model parameter is missing or malformed.
    #[error("parameter error: {source}")]
    Parameter {
        /// The underlying lookup error.
        #[from]
        source: shoal_types::ParameterError,
    },

    /// Clock initialization failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: shoal_core::clock::ClockError,
    },

    /// Seeding the population store failed.
    #[error("population error: {source}")]
    Population {
        /// The underlying store error.
        #[from]
        source: shoal_population::PopulationError,
    },

    /// Assembling the simulation state failed.
    #[error("state error: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: shoal_core::step::StepError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: shoal_core::runner::RunnerError,
    },

    /// A step report could not be rendered.
    #[error("report error: {source}")]
    Report {
        /// The underlying output error.
        #[from]
        source: shoal_output::OutputError,
    },

    /// Writing reports to disk failed.
    #[error("report I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// No species is declared in the parameters.
    #[error("no species declared (expected species.name.sp<i> parameters)")]
    NoSpecies,
}
