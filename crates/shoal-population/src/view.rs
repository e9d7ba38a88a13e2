//! Derived views over the population.
//!
//! A [`View`] is a node in a derivation chain: it names its parent (the
//! root population, another view, or a pooled member set), carries an
//! ordered predicate list, and holds the members materialized by its last
//! refresh. Views never own their parent and never mutate schools.
//!
//! The [`ViewGraph`] owns the nodes and hands out [`ViewId`] handles, so a
//! child refers to its parent by handle and both can be refreshed
//! independently while the population changes between steps.
//!
//! # Degenerate views
//!
//! A view without a parent, or with an empty predicate list, is a valid
//! empty leaf: every refresh yields no members and no error. Note the
//! asymmetry with [`View::accepts`], where an empty list accepts every
//! school.

use std::collections::BTreeMap;

use shoal_types::{School, SchoolId, ViewId};
use tracing::debug;

use crate::error::PopulationError;
use crate::members::Members;
use crate::population::Population;
use crate::predicate::{Predicate, accepts_all};

/// Derivation level of the root population.
pub const ROOT_LEVEL: u32 = 0;

/// Where a view draws its candidate members from.
#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    /// The root population, in canonical order.
    Root,
    /// Another view of the same graph, as of its last refresh.
    View(ViewId),
    /// A fixed pool of school ids, resolved through the population.
    Pool(Members),
}

/// A filtered, materialized view of its parent.
#[derive(Debug, Clone)]
pub struct View {
    id: ViewId,
    parent: Option<Parent>,
    predicates: Vec<Predicate>,
    level: u32,
    members: Members,
    refreshed: bool,
}

impl View {
    /// Handle of this view.
    pub const fn id(&self) -> ViewId {
        self.id
    }

    /// Parent relation, `None` for a degenerate parentless view.
    pub const fn parent(&self) -> Option<&Parent> {
        self.parent.as_ref()
    }

    /// Predicates applied on refresh, in evaluation order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Derivation depth: root population is 0, children one deeper.
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Members as of the last refresh (empty before the first one).
    pub const fn members(&self) -> &Members {
        &self.members
    }

    /// Whether [`ViewGraph::refresh`] has run on this view at least once.
    pub const fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    /// Whether `school` passes every predicate of this view.
    ///
    /// An empty predicate list accepts every school, although refreshing
    /// such a view yields no members.
    pub fn accepts(&self, school: &School) -> bool {
        accepts_all(&self.predicates, school)
    }

    fn filter<'a>(&self, candidates: impl Iterator<Item = &'a School>) -> Members {
        if self.predicates.is_empty() {
            return Members::new();
        }
        candidates
            .filter(|school| accepts_all(&self.predicates, school))
            .map(|school| school.id)
            .collect()
    }
}

/// Owner of all views derived during a process scope.
#[derive(Debug, Clone, Default)]
pub struct ViewGraph {
    views: BTreeMap<ViewId, View>,
}

impl ViewGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            views: BTreeMap::new(),
        }
    }

    /// Register an unrefreshed view.
    ///
    /// Without `level_override` the level is one below the parent: a
    /// view of the root or of a pool sits at level 1, a view of another
    /// view at that view's level plus one. A parentless view sits at
    /// [`ROOT_LEVEL`].
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownView`] if the parent handle is
    /// not registered in this graph.
    pub fn create(
        &mut self,
        parent: Option<Parent>,
        predicates: Vec<Predicate>,
        level_override: Option<u32>,
    ) -> Result<ViewId, PopulationError> {
        let derived = match &parent {
            None => ROOT_LEVEL,
            Some(Parent::Root | Parent::Pool(_)) => ROOT_LEVEL.saturating_add(1),
            Some(Parent::View(parent_id)) => self.view(*parent_id)?.level.saturating_add(1),
        };

        let id = ViewId::new();
        let view = View {
            id,
            parent,
            predicates,
            level: level_override.unwrap_or(derived),
            members: Members::new(),
            refreshed: false,
        };
        debug!(view = %id, level = view.level, predicates = view.predicates.len(), "View created");
        self.views.insert(id, view);
        Ok(id)
    }

    /// Recompute the members of `id` from its parent's current members.
    ///
    /// Root parents are read from `population` directly; view and pool
    /// parents are resolved through it, skipping ids no longer stored.
    /// The parent view is not refreshed first: callers refresh ancestors
    /// before descendants (see [`refresh_chain`](Self::refresh_chain)).
    ///
    /// Returns the new member count.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownView`] if `id` or its parent
    /// view is not registered.
    pub fn refresh(&mut self, id: ViewId, population: &Population) -> Result<usize, PopulationError> {
        let view = self.view(id)?;
        let members = match &view.parent {
            None => Members::new(),
            Some(Parent::Root) => view.filter(population.iter()),
            Some(Parent::View(parent_id)) => {
                let parent = self.view(*parent_id)?;
                view.filter(parent.members.iter().filter_map(|sid| population.get(sid)))
            }
            Some(Parent::Pool(pool)) => view.filter(pool.iter().filter_map(|sid| population.get(sid))),
        };

        let count = members.len();
        let view = self.views.get_mut(&id).ok_or(PopulationError::UnknownView(id))?;
        view.members = members;
        view.refreshed = true;
        debug!(view = %id, level = view.level, members = count, "View refreshed");
        Ok(count)
    }

    /// Refresh every view-ancestor of `id`, root-most first, then `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownView`] if any handle in the
    /// chain is not registered.
    pub fn refresh_chain(&mut self, id: ViewId, population: &Population) -> Result<usize, PopulationError> {
        let chain = self.ancestry(id)?;
        let mut count = 0;
        for view_id in chain.into_iter().rev() {
            count = self.refresh(view_id, population)?;
        }
        Ok(count)
    }

    /// `id` followed by its view ancestors, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownView`] if any handle in the
    /// chain is not registered.
    pub fn ancestry(&self, id: ViewId) -> Result<Vec<ViewId>, PopulationError> {
        let mut chain = vec![id];
        let mut current = self.view(id)?;
        while let Some(Parent::View(parent_id)) = &current.parent {
            // A chain never holds more handles than the graph has views.
            if chain.len() > self.views.len() {
                break;
            }
            chain.push(*parent_id);
            current = self.view(*parent_id)?;
        }
        Ok(chain)
    }

    /// The view registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownView`] if `id` is not registered.
    pub fn view(&self, id: ViewId) -> Result<&View, PopulationError> {
        self.views.get(&id).ok_or(PopulationError::UnknownView(id))
    }

    /// Members of `id` as of its last refresh.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownView`] if `id` is not registered.
    pub fn members(&self, id: ViewId) -> Result<&[SchoolId], PopulationError> {
        Ok(self.view(id)?.members.as_slice())
    }

    /// Members of `id` resolved to schools, skipping ids no longer stored.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownView`] if `id` is not registered.
    pub fn schools<'p>(
        &self,
        id: ViewId,
        population: &'p Population,
    ) -> Result<Vec<&'p School>, PopulationError> {
        Ok(self
            .view(id)?
            .members
            .iter()
            .filter_map(|sid| population.get(sid))
            .collect())
    }

    /// Drop a view. Children keep their handle to it and fail on their
    /// next refresh.
    pub fn remove(&mut self, id: ViewId) -> Option<View> {
        self.views.remove(&id)
    }

    /// Number of registered views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether no view is registered.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use shoal_types::SpeciesId;

    use super::*;

    fn population(specs: &[(u16, bool)]) -> (Population, Vec<SchoolId>) {
        let mut pop = Population::new();
        let mut ids = Vec::new();
        for &(species, alive) in specs {
            let mut school = School::new(SpeciesId(species), 10.0, 10.0, 100.0);
            school.alive = alive;
            ids.push(school.id);
            assert!(pop.add(school).is_ok());
        }
        (pop, ids)
    }

    #[test]
    fn create_is_unrefreshed_and_empty() {
        let (pop, _) = population(&[(0, true)]);
        let mut graph = ViewGraph::new();
        let id = graph.create(Some(Parent::Root), vec![Predicate::Alive], None);
        assert!(id.is_ok());
        if let Ok(id) = id {
            let view = graph.view(id);
            assert!(view.is_ok_and(|v| !v.is_refreshed() && v.members().is_empty()));
            assert_eq!(graph.refresh(id, &pop), Ok(1));
            assert!(graph.view(id).is_ok_and(View::is_refreshed));
        }
    }

    #[test]
    fn levels_follow_derivation_depth() {
        let mut graph = ViewGraph::new();
        let first = graph.create(Some(Parent::Root), vec![Predicate::Alive], None);
        assert!(first.is_ok());
        if let Ok(first) = first {
            let second = graph.create(Some(Parent::View(first)), vec![Predicate::Alive], None);
            assert!(second.is_ok());
            if let Ok(second) = second {
                assert_eq!(graph.view(first).map(View::level), Ok(1));
                assert_eq!(graph.view(second).map(View::level), Ok(2));
            }
        }
    }

    #[test]
    fn level_override_wins() {
        let mut graph = ViewGraph::new();
        let id = graph.create(Some(Parent::Pool(Members::new())), vec![Predicate::Alive], Some(7));
        assert!(id.is_ok_and(|id| graph.view(id).map(View::level) == Ok(7)));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut graph = ViewGraph::new();
        let ghost = ViewId::new();
        assert_eq!(
            graph.create(Some(Parent::View(ghost)), vec![Predicate::Alive], None),
            Err(PopulationError::UnknownView(ghost))
        );
    }

    #[test]
    fn parentless_view_refreshes_empty_without_error() {
        let (pop, _) = population(&[(0, true), (1, true)]);
        let mut graph = ViewGraph::new();
        let id = graph.create(None, vec![Predicate::Alive], None);
        assert!(id.is_ok());
        if let Ok(id) = id {
            assert_eq!(graph.view(id).map(View::level), Ok(ROOT_LEVEL));
            assert_eq!(graph.refresh(id, &pop), Ok(0));
            assert_eq!(graph.refresh(id, &pop), Ok(0));
            assert!(graph.members(id).is_ok_and(<[SchoolId]>::is_empty));
        }
    }

    #[test]
    fn predicate_less_view_refreshes_empty_but_accepts_all() {
        let (pop, _) = population(&[(0, true), (1, false)]);
        let mut graph = ViewGraph::new();
        let id = graph.create(Some(Parent::Root), Vec::new(), None);
        assert!(id.is_ok());
        if let Ok(id) = id {
            assert_eq!(graph.refresh(id, &pop), Ok(0));
            let accepts_everything = graph
                .view(id)
                .is_ok_and(|view| pop.iter().all(|school| view.accepts(school)));
            assert!(accepts_everything);
        }
    }

    #[test]
    fn refresh_reads_parent_as_last_refreshed() {
        let (mut pop, ids) = population(&[(0, true), (0, true), (1, true)]);
        let mut graph = ViewGraph::new();
        let alive = graph.create(Some(Parent::Root), vec![Predicate::Alive], None);
        assert!(alive.is_ok());
        let Ok(alive) = alive else { return };
        let sp0 = graph.create(Some(Parent::View(alive)), vec![Predicate::Species(SpeciesId(0))], None);
        assert!(sp0.is_ok());
        let Ok(sp0) = sp0 else { return };

        // Child refreshed before its parent sees an empty parent.
        assert_eq!(graph.refresh(sp0, &pop), Ok(0));
        assert_eq!(graph.refresh(alive, &pop), Ok(3));
        assert_eq!(graph.refresh(sp0, &pop), Ok(2));

        // A death is invisible until the chain is refreshed again.
        if let Some(school) = pop.get_mut(ids[0]) {
            school.alive = false;
        }
        assert_eq!(graph.refresh(sp0, &pop), Ok(2));
        assert_eq!(graph.refresh_chain(sp0, &pop), Ok(1));
        assert_eq!(graph.members(sp0), Ok(&[ids[1]][..]));
    }

    #[test]
    fn removed_schools_are_skipped() {
        let (mut pop, ids) = population(&[(0, true), (0, true)]);
        let mut graph = ViewGraph::new();
        let alive = graph.create(Some(Parent::Root), vec![Predicate::Alive], None);
        let Ok(alive) = alive else { return };
        let child = graph.create(Some(Parent::View(alive)), vec![Predicate::Dead], None);
        let Ok(child) = child else { return };
        assert_eq!(graph.refresh(alive, &pop), Ok(2));

        if let Some(school) = pop.get_mut(ids[1]) {
            school.alive = false;
        }
        let _ = pop.remove_dead();
        // Parent still lists the removed school; it cannot be resolved.
        assert_eq!(graph.refresh(child, &pop), Ok(0));
        assert!(graph.schools(alive, &pop).is_ok_and(|schools| schools.len() == 1));
    }

    #[test]
    fn ancestry_lists_nearest_first() {
        let mut graph = ViewGraph::new();
        let Ok(a) = graph.create(Some(Parent::Root), vec![Predicate::Alive], None) else { return };
        let Ok(b) = graph.create(Some(Parent::View(a)), vec![Predicate::Alive], None) else { return };
        let Ok(c) = graph.create(Some(Parent::View(b)), vec![Predicate::Alive], None) else { return };
        assert_eq!(graph.ancestry(c), Ok(vec![c, b, a]));
    }

    #[test]
    fn removed_parent_fails_child_refresh() {
        let (pop, _) = population(&[(0, true)]);
        let mut graph = ViewGraph::new();
        let Ok(a) = graph.create(Some(Parent::Root), vec![Predicate::Alive], None) else { return };
        let Ok(b) = graph.create(Some(Parent::View(a)), vec![Predicate::Alive], None) else { return };
        assert!(graph.remove(a).is_some());
        assert_eq!(graph.refresh(b, &pop), Err(PopulationError::UnknownView(a)));
        assert_eq!(graph.len(), 1);
    }
}
