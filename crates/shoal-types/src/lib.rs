//! Shared type definitions for the Shoal population simulation.
//!
//! This crate is the single source of truth for the data every other
//! crate reads: school identity and attributes, species declarations,
//! distribution kinds, and the keyed parameter lookup that components
//! receive as an explicit context object.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers for schools, views, species, and cells
//! - [`enums`] -- Enumeration types ([`DistributionType`])
//! - [`structs`] -- The [`School`] entity and [`Species`] declaration
//! - [`parameters`] -- Keyed scalar lookup with glob key enumeration
//! - [`error`] -- Error types for parameter access ([`ParameterError`])

pub mod enums;
pub mod error;
pub mod ids;
pub mod parameters;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::DistributionType;
pub use error::ParameterError;
pub use ids::{CellId, SchoolId, SpeciesId, ViewId};
pub use parameters::{ParameterLookup, Parameters};
pub use structs::{School, Species};
