//! Error types for the shoal-output crate.

use shoal_population::PopulationError;
use shoal_types::{DistributionType, ParameterError};

/// Errors that can occur while building classifiers or reports.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// A parameter could not be read.
    #[error("parameter error: {source}")]
    Parameter {
        /// The underlying lookup error.
        #[from]
        source: ParameterError,
    },

    /// The resolved class increment cannot produce a finite class list.
    #[error("invalid {kind} distribution increment: {increment}")]
    InvalidIncrement {
        /// The distribution kind being built.
        kind: DistributionType,
        /// The offending increment.
        increment: f64,
    },

    /// The resolved bounds span more classes than a table may hold.
    #[error("{kind} distribution spans {classes} classes, limit is {limit}")]
    TooManyClasses {
        /// The distribution kind being built.
        kind: DistributionType,
        /// Number of classes the bounds would produce.
        classes: f64,
        /// The class limit.
        limit: usize,
    },

    /// A stage structure name is not one of `age`, `size`, `weight`, `tl`.
    #[error("unknown stage structure {value:?} for {key}")]
    UnknownStructure {
        /// The parameter key read.
        key: String,
        /// The unrecognized value.
        value: String,
    },

    /// A view lookup failed while aggregating its members.
    #[error("population error: {source}")]
    Population {
        /// The underlying view or store error.
        #[from]
        source: PopulationError,
    },

    /// A report could not be serialized.
    #[error("report serialization failed: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
