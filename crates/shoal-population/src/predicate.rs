//! Pure per-school tests used to derive views.
//!
//! A [`Predicate`] never mutates the school it inspects, never fails, and
//! returns the same answer for the same school state. A view accepts a
//! school when every predicate in its list accepts it; the order of the
//! list only changes how early the check short-circuits.

use std::collections::BTreeMap;
use std::sync::Arc;

use shoal_types::{School, Species, SpeciesId};

/// Single-method capability for caller-defined school tests.
///
/// Implementations must be pure: no side effects, no panics, and a
/// deterministic answer for a given school state.
pub trait SchoolFilter: core::fmt::Debug + Send + Sync {
    /// Whether the school passes this test.
    fn accept(&self, school: &School) -> bool;
}

/// Lifespan of each species in simulation steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lifespans {
    steps: BTreeMap<SpeciesId, u32>,
}

impl Lifespans {
    /// Build the table from species declarations.
    pub fn from_species(species: &[Species], steps_per_year: u32) -> Self {
        let steps = species
            .iter()
            .map(|sp| (sp.id, sp.lifespan_steps(steps_per_year)))
            .collect();
        Self { steps }
    }

    /// Set the lifespan of one species.
    pub fn insert(&mut self, species: SpeciesId, steps: u32) {
        self.steps.insert(species, steps);
    }

    /// Lifespan of `species` in steps, if declared.
    pub fn get(&self, species: SpeciesId) -> Option<u32> {
        self.steps.get(&species).copied()
    }
}

/// A pure boolean test over one school.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// The school is alive.
    Alive,
    /// The school is dead.
    Dead,
    /// The school is alive and inside the simulated domain.
    Present,
    /// The school belongs to the given species.
    Species(SpeciesId),
    /// The school has reached its species lifespan.
    ///
    /// Schools of species missing from the table never match.
    ExceedsLifespan(Lifespans),
    /// The school is alive and outside the simulated domain.
    OutOfDomain,
    /// A caller-defined test. Two custom predicates are equal only when
    /// they share the same underlying filter instance.
    Custom(Arc<dyn SchoolFilter>),
}

impl Predicate {
    /// Wrap a caller-defined filter.
    pub fn custom(filter: impl SchoolFilter + 'static) -> Self {
        Self::Custom(Arc::new(filter))
    }
}

impl SchoolFilter for Predicate {
    fn accept(&self, school: &School) -> bool {
        match self {
            Self::Alive => school.alive,
            Self::Dead => !school.alive,
            Self::Present => school.alive && school.in_domain,
            Self::Species(species) => school.species == *species,
            Self::ExceedsLifespan(lifespans) => lifespans
                .get(school.species)
                .is_some_and(|lifespan| school.age_steps >= lifespan),
            Self::OutOfDomain => school.alive && !school.in_domain,
            Self::Custom(filter) => filter.accept(school),
        }
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Alive, Self::Alive)
            | (Self::Dead, Self::Dead)
            | (Self::Present, Self::Present)
            | (Self::OutOfDomain, Self::OutOfDomain) => true,
            (Self::Species(a), Self::Species(b)) => a == b,
            (Self::ExceedsLifespan(a), Self::ExceedsLifespan(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Logical AND of `predicates` over `school`, short-circuiting on the
/// first rejection. An empty list accepts every school.
pub fn accepts_all(predicates: &[Predicate], school: &School) -> bool {
    predicates.iter().all(|predicate| predicate.accept(school))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school(species: u16, alive: bool, in_domain: bool) -> School {
        let mut s = School::new(SpeciesId(species), 10.0, 15.0, 100.0);
        s.alive = alive;
        s.in_domain = in_domain;
        s
    }

    #[derive(Debug)]
    struct LongerThan(f64);

    impl SchoolFilter for LongerThan {
        fn accept(&self, school: &School) -> bool {
            school.length > self.0
        }
    }

    #[test]
    fn liveness_predicates() {
        let alive = school(0, true, true);
        let dead = school(0, false, true);
        assert!(Predicate::Alive.accept(&alive));
        assert!(!Predicate::Alive.accept(&dead));
        assert!(Predicate::Dead.accept(&dead));
        assert!(!Predicate::Dead.accept(&alive));
    }

    #[test]
    fn domain_predicates_require_liveness() {
        let inside = school(0, true, true);
        let outside = school(0, true, false);
        let dead_outside = school(0, false, false);

        assert!(Predicate::Present.accept(&inside));
        assert!(!Predicate::Present.accept(&outside));
        assert!(Predicate::OutOfDomain.accept(&outside));
        assert!(!Predicate::OutOfDomain.accept(&inside));
        assert!(!Predicate::OutOfDomain.accept(&dead_outside));
    }

    #[test]
    fn species_predicate() {
        assert!(Predicate::Species(SpeciesId(2)).accept(&school(2, true, true)));
        assert!(!Predicate::Species(SpeciesId(2)).accept(&school(1, true, true)));
    }

    #[test]
    fn lifespan_threshold_is_inclusive() {
        let mut lifespans = Lifespans::default();
        lifespans.insert(SpeciesId(0), 48);
        let predicate = Predicate::ExceedsLifespan(lifespans);

        let mut s = school(0, true, true);
        s.age_steps = 47;
        assert!(!predicate.accept(&s));
        s.age_steps = 48;
        assert!(predicate.accept(&s));

        // Undeclared species never reach a lifespan.
        let mut other = school(5, true, true);
        other.age_steps = u32::MAX;
        assert!(!predicate.accept(&other));
    }

    #[test]
    fn lifespans_from_species() {
        let species = vec![
            Species {
                id: SpeciesId(0),
                name: String::from("anchovy"),
                lifespan_years: 3.0,
            },
            Species {
                id: SpeciesId(1),
                name: String::from("hake"),
                lifespan_years: 10.0,
            },
        ];
        let table = Lifespans::from_species(&species, 12);
        assert_eq!(table.get(SpeciesId(0)), Some(36));
        assert_eq!(table.get(SpeciesId(1)), Some(120));
        assert_eq!(table.get(SpeciesId(2)), None);
    }

    #[test]
    fn custom_predicate_and_identity_equality() {
        let filter: Arc<dyn SchoolFilter> = Arc::new(LongerThan(5.0));
        let a = Predicate::Custom(Arc::clone(&filter));
        let b = Predicate::Custom(filter);
        let c = Predicate::custom(LongerThan(5.0));

        assert!(a.accept(&school(0, true, true)));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Predicate::Alive, Predicate::Alive);
        assert_eq!(Predicate::Species(SpeciesId(1)), Predicate::Species(SpeciesId(1)));
        assert_ne!(Predicate::Species(SpeciesId(1)), Predicate::Species(SpeciesId(2)));
        assert_ne!(Predicate::Alive, Predicate::Present);
    }

    #[test]
    fn empty_list_accepts_everything() {
        assert!(accepts_all(&[], &school(0, false, false)));
    }

    #[test]
    fn conjunction_is_order_independent() {
        let s = school(1, true, false);
        let forward = [Predicate::Alive, Predicate::Species(SpeciesId(1)), Predicate::Present];
        let backward = [Predicate::Present, Predicate::Species(SpeciesId(1)), Predicate::Alive];
        assert_eq!(accepts_all(&forward, &s), accepts_all(&backward, &s));
        assert!(!accepts_all(&forward, &s));
    }
}
