//! Error types for the shoal-population crate.

use shoal_types::{SchoolId, ViewId};

/// Errors that can occur when working with the population or its views.
///
/// Degenerate views (no parent, no predicates) are not errors: they
/// refresh to an empty member set. Only dangling handles are reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PopulationError {
    /// A view handle does not exist in the graph.
    #[error("view not found: {0}")]
    UnknownView(ViewId),

    /// A school id does not exist in the population.
    #[error("school not found: {0}")]
    UnknownSchool(SchoolId),

    /// A school with the same id is already in the population.
    #[error("duplicate school id: {0}")]
    DuplicateSchool(SchoolId),
}
