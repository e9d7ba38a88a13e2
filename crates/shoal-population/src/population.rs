//! The root population store.
//!
//! [`Population`] owns every school of the simulation in insertion order.
//! Its iteration order is the canonical ordering every level-1 view
//! inherits. Only the simulation loop mutates it, between steps.
//!
//! Besides plain storage it provides the per-step presence counts
//! (inside or outside the domain) and two cached snapshots: alive schools
//! by species and schools by grid cell. Both snapshots are explicitly
//! refreshed by the caller.

use std::collections::BTreeMap;

use shoal_types::{CellId, School, SchoolId, SpeciesId};
use tracing::debug;

use crate::error::PopulationError;
use crate::predicate::{Predicate, accepts_all};

/// Ordered, duplicate-free store of all schools.
#[derive(Debug, Clone, Default)]
pub struct Population {
    /// Schools in canonical order.
    schools: Vec<School>,
    /// Position of each school in `schools`.
    index: BTreeMap<SchoolId, usize>,
    /// Cached alive schools per species.
    by_species: BTreeMap<SpeciesId, Vec<SchoolId>>,
    /// Located schools per cell, as of the last `update_school_map`.
    by_cell: BTreeMap<CellId, Vec<SchoolId>>,
}

impl Population {
    /// Create an empty population.
    pub const fn new() -> Self {
        Self {
            schools: Vec::new(),
            index: BTreeMap::new(),
            by_species: BTreeMap::new(),
            by_cell: BTreeMap::new(),
        }
    }

    /// Append a school.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::DuplicateSchool`] if a school with the
    /// same id is already stored.
    pub fn add(&mut self, school: School) -> Result<(), PopulationError> {
        if self.index.contains_key(&school.id) {
            return Err(PopulationError::DuplicateSchool(school.id));
        }
        self.index.insert(school.id, self.schools.len());
        self.schools.push(school);
        self.by_species.clear();
        Ok(())
    }

    /// Look up a school by id.
    pub fn get(&self, id: SchoolId) -> Option<&School> {
        self.index.get(&id).and_then(|&pos| self.schools.get(pos))
    }

    /// Look up a school by id for mutation.
    ///
    /// Cached snapshots are not invalidated; callers that change species
    /// membership or liveness refresh them explicitly. The school's `id`
    /// keys the position index and must not be rewritten.
    pub fn get_mut(&mut self, id: SchoolId) -> Option<&mut School> {
        match self.index.get(&id) {
            Some(&pos) => self.schools.get_mut(pos),
            None => None,
        }
    }

    /// Whether a school with this id is stored.
    pub fn contains(&self, id: SchoolId) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterate over all schools in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &School> {
        self.schools.iter()
    }

    /// Number of stored schools, dead or alive.
    pub fn len(&self) -> usize {
        self.schools.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }

    /// Remove every school and clear the snapshots.
    pub fn clear(&mut self) {
        self.schools.clear();
        self.index.clear();
        self.by_species.clear();
        self.by_cell.clear();
    }

    /// Remove dead schools, keeping the order of the survivors.
    ///
    /// Returns the ids of the removed schools in their former order.
    pub fn remove_dead(&mut self) -> Vec<SchoolId> {
        let mut removed = Vec::new();
        self.schools.retain(|school| {
            if school.alive {
                true
            } else {
                removed.push(school.id);
                false
            }
        });
        if !removed.is_empty() {
            self.reindex();
        }
        self.by_species.clear();
        debug!(removed = removed.len(), remaining = self.schools.len(), "Dead schools removed");
        removed
    }

    fn reindex(&mut self) {
        self.index = self
            .schools
            .iter()
            .enumerate()
            .map(|(pos, school)| (school.id, pos))
            .collect();
    }

    /// Ids of the schools accepted by every predicate, in canonical order.
    pub fn select(&self, predicates: &[Predicate]) -> Vec<SchoolId> {
        self.schools
            .iter()
            .filter(|school| accepts_all(predicates, school))
            .map(|school| school.id)
            .collect()
    }

    /// Alive schools inside the simulated domain.
    pub fn present_schools(&self) -> Vec<SchoolId> {
        self.select(&[Predicate::Present])
    }

    /// Alive schools outside the simulated domain.
    pub fn out_schools(&self) -> Vec<SchoolId> {
        self.select(&[Predicate::OutOfDomain])
    }

    /// Alive schools of `species`.
    ///
    /// With `update == false` the list cached since the last structural
    /// change is returned; it may be stale if liveness changed through
    /// [`get_mut`](Self::get_mut).
    pub fn schools_of_species(&mut self, species: SpeciesId, update: bool) -> &[SchoolId] {
        if update || !self.by_species.contains_key(&species) {
            let ids = self.select(&[Predicate::Species(species), Predicate::Alive]);
            self.by_species.insert(species, ids);
        }
        self.by_species.get(&species).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Snapshot the located schools per grid cell.
    ///
    /// Unlocated schools are skipped and cells left empty are dropped.
    pub fn update_school_map(&mut self) {
        self.by_cell.clear();
        for school in &self.schools {
            if let Some(cell) = school.cell {
                self.by_cell.entry(cell).or_default().push(school.id);
            }
        }
    }

    /// Schools located in `cell` as of the last
    /// [`update_school_map`](Self::update_school_map).
    pub fn schools_in_cell(&self, cell: CellId) -> &[SchoolId] {
        self.by_cell.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cells that held at least one school at the last snapshot.
    pub fn occupied_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.by_cell.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school(species: u16) -> School {
        School::new(SpeciesId(species), 10.0, 12.0, 500.0)
    }

    fn population(schools: &[School]) -> Population {
        let mut pop = Population::new();
        for s in schools {
            assert!(pop.add(s.clone()).is_ok());
        }
        pop
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let s = school(0);
        let mut pop = Population::new();
        assert!(pop.add(s.clone()).is_ok());
        assert_eq!(pop.add(s.clone()), Err(PopulationError::DuplicateSchool(s.id)));
        assert_eq!(pop.len(), 1);
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let schools: Vec<School> = (0..5).map(|i| school(i % 2)).collect();
        let pop = population(&schools);
        let ids: Vec<SchoolId> = pop.iter().map(|s| s.id).collect();
        let expected: Vec<SchoolId> = schools.iter().map(|s| s.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn remove_dead_keeps_survivor_order_and_index() {
        let schools: Vec<School> = (0..4).map(|_| school(0)).collect();
        let mut pop = population(&schools);
        let dead = [schools[1].id, schools[2].id];
        for id in dead {
            if let Some(s) = pop.get_mut(id) {
                s.alive = false;
            }
        }

        let removed = pop.remove_dead();
        assert_eq!(removed, dead.to_vec());
        assert_eq!(pop.len(), 2);
        assert!(pop.get(schools[3].id).is_some());
        assert!(pop.get(schools[1].id).is_none());
        let ids: Vec<SchoolId> = pop.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![schools[0].id, schools[3].id]);
    }

    #[test]
    fn every_school_reachable_by_id_after_mutation_and_removal() {
        let schools: Vec<School> = (0..5).map(|i| school(i % 2)).collect();
        let mut pop = population(&schools);
        for s in &schools {
            if let Some(stored) = pop.get_mut(s.id) {
                stored.age_steps = 3;
                stored.alive = s.species == SpeciesId(0);
            }
        }
        pop.remove_dead();

        let ids: Vec<SchoolId> = pop.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 3);
        for id in ids {
            assert_eq!(pop.get(id).map(|s| s.id), Some(id));
            assert!(pop.get(id).is_some_and(|s| s.age_steps == 3));
        }
    }

    #[test]
    fn selections_by_state() {
        let mut schools: Vec<School> = (0..4).map(|_| school(0)).collect();
        schools[1].alive = false;
        schools[2].in_domain = false;
        let pop = population(&schools);

        assert_eq!(pop.select(&[Predicate::Alive]).len(), 3);
        assert_eq!(pop.present_schools(), vec![schools[0].id, schools[3].id]);
        assert_eq!(pop.out_schools(), vec![schools[2].id]);
    }

    #[test]
    fn species_cache_is_stale_until_updated() {
        let schools: Vec<School> = vec![school(0), school(1), school(1)];
        let mut pop = population(&schools);
        assert_eq!(pop.schools_of_species(SpeciesId(1), false).len(), 2);

        if let Some(s) = pop.get_mut(schools[1].id) {
            s.alive = false;
        }
        // Cached list still holds the dead school.
        assert_eq!(pop.schools_of_species(SpeciesId(1), false).len(), 2);
        // Forced update sees the change.
        assert_eq!(pop.schools_of_species(SpeciesId(1), true), &[schools[2].id]);
    }

    #[test]
    fn species_cache_invalidated_by_add() {
        let mut pop = population(&[school(0)]);
        assert_eq!(pop.schools_of_species(SpeciesId(0), false).len(), 1);
        assert!(pop.add(school(0)).is_ok());
        assert_eq!(pop.schools_of_species(SpeciesId(0), false).len(), 2);
    }

    #[test]
    fn school_map_groups_located_schools() {
        let mut schools: Vec<School> = (0..3).map(|_| school(0)).collect();
        schools[0].cell = Some(CellId(7));
        schools[1].cell = Some(CellId(7));
        let mut pop = population(&schools);
        pop.update_school_map();

        assert_eq!(pop.schools_in_cell(CellId(7)), &[schools[0].id, schools[1].id]);
        assert!(pop.schools_in_cell(CellId(8)).is_empty());
        assert_eq!(pop.occupied_cells().collect::<Vec<_>>(), vec![CellId(7)]);

        if let Some(s) = pop.get_mut(schools[0].id) {
            s.cell = None;
        }
        pop.update_school_map();
        assert_eq!(pop.schools_in_cell(CellId(7)), &[schools[1].id]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut located = school(0);
        located.cell = Some(CellId(2));
        let mut pop = population(&[located, school(1)]);
        pop.update_school_map();
        assert_eq!(pop.occupied_cells().count(), 1);
        pop.clear();
        assert!(pop.is_empty());
        assert_eq!(pop.occupied_cells().count(), 0);
    }
}
