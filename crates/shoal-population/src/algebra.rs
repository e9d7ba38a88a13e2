//! Stateless constructions of new views from existing ones.
//!
//! - [`subset`] derives a child one level below a parent and refreshes it.
//! - [`merge`] pools the members of two views and re-filters the pool with
//!   the union of both predicate lists.
//!
//! `merge` is not a set intersection. Its contract is
//!
//! ```text
//! members(merge(A, B)) == { e in members(A) ∪ members(B)
//!                           : every p in filters(A) ∪ filters(B) accepts e }
//! ```
//!
//! which differs from `members(A) ∩ members(B)` whenever A or B inherited
//! filtering from a parent chain that the other view does not share.

use shoal_types::ViewId;
use tracing::debug;

use crate::error::PopulationError;
use crate::population::Population;
use crate::predicate::Predicate;
use crate::view::{Parent, ViewGraph};

/// Build a child of `parent` filtered by `predicates`, refreshed against
/// the parent's current members.
///
/// # Errors
///
/// Returns [`PopulationError::UnknownView`] if `parent` names a view that
/// is not registered.
pub fn subset(
    graph: &mut ViewGraph,
    parent: Parent,
    predicates: Vec<Predicate>,
    population: &Population,
) -> Result<ViewId, PopulationError> {
    let id = graph.create(Some(parent), predicates, None)?;
    graph.refresh(id, population)?;
    Ok(id)
}

/// Pool the members of `a` and `b` and keep those accepted by every
/// predicate of either view.
///
/// The result is a rootless view over the pooled ids (members of `a` in
/// order, then members of `b` not already pooled), carrying the predicate
/// union and inheriting the deeper of the two levels. It is refreshed
/// before being returned.
///
/// # Errors
///
/// Returns [`PopulationError::UnknownView`] if `a` or `b` is not
/// registered.
pub fn merge(
    graph: &mut ViewGraph,
    a: ViewId,
    b: ViewId,
    population: &Population,
) -> Result<ViewId, PopulationError> {
    let view_a = graph.view(a)?;
    let view_b = graph.view(b)?;

    let pool = view_a.members().union(view_b.members());
    let predicates = predicate_union(view_a.predicates(), view_b.predicates());
    let level = view_a.level().max(view_b.level());
    debug!(
        left = %a,
        right = %b,
        pooled = pool.len(),
        predicates = predicates.len(),
        level,
        "Merging views"
    );

    let id = graph.create(Some(Parent::Pool(pool)), predicates, Some(level))?;
    graph.refresh(id, population)?;
    Ok(id)
}

/// Predicates of `a` followed by those of `b` not already present.
pub fn predicate_union(a: &[Predicate], b: &[Predicate]) -> Vec<Predicate> {
    let mut union = a.to_vec();
    for predicate in b {
        if !union.contains(predicate) {
            union.push(predicate.clone());
        }
    }
    union
}
