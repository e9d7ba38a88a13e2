//! Class distributions, stages, and per-step reports for the Shoal
//! simulation.
//!
//! Output writers bucket a continuous school attribute (age, length,
//! weight, trophic level) into discrete classes and aggregate the members
//! of a view into class-indexed tables.
//!
//! # Modules
//!
//! - [`distribution`] -- The classifier: boundaries resolved from
//!   parameters with species, global, then default priority ([`Distribution`])
//! - [`stage`] -- Explicit per-species stage thresholds ([`SchoolStage`])
//! - [`histogram`] -- Species x class aggregation tables ([`ClassHistogram`])
//! - [`report`] -- Serializable per-step summaries ([`StepReport`])
//! - [`error`] -- Error types ([`OutputError`])

pub mod distribution;
pub mod error;
pub mod histogram;
pub mod report;
pub mod stage;

pub use distribution::{
    BELOW_RANGE, BoundsSource, Distribution, DistributionBounds, DistributionDefaults,
    DistributionScope, MAX_CLASSES, measure,
};
pub use error::OutputError;
pub use histogram::{ClassHistogram, ClassRow};
pub use report::{SpeciesSummary, StepReport};
pub use stage::{SchoolStage, StageRow, StageTable};
