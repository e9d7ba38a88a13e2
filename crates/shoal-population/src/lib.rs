//! Population store, predicates, and derived views for the Shoal simulation.
//!
//! Every process that needs "the schools that matter to me" (mortality
//! scoping, output reporting, recruitment checks) goes through this crate.
//! The [`Population`] is the authoritative, ordered store; a
//! [`ViewGraph`] holds filtered views derived from it, each view naming
//! its parent by handle rather than owning it.
//!
//! Recomputation is pull-based and caller-driven: nothing is refreshed
//! when the population changes. A caller refreshes parents before
//! children, once per step, before reading members.
//!
//! # Modules
//!
//! - [`predicate`] -- Pure per-school tests ([`Predicate`], [`SchoolFilter`])
//! - [`members`] -- Ordered, duplicate-free member container ([`Members`])
//! - [`view`] -- View nodes and the graph that owns them ([`View`], [`ViewGraph`])
//! - [`algebra`] -- [`subset`] and [`merge`] constructions over views
//! - [`population`] -- The root school store ([`Population`])
//! - [`error`] -- Error types ([`PopulationError`])

pub mod algebra;
pub mod error;
pub mod members;
pub mod population;
pub mod predicate;
pub mod view;

pub use algebra::{merge, predicate_union, subset};
pub use error::PopulationError;
pub use members::Members;
pub use population::Population;
pub use predicate::{Lifespans, Predicate, SchoolFilter, accepts_all};
pub use view::{Parent, ROOT_LEVEL, View, ViewGraph};
