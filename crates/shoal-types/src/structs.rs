//! Core entity structs: the [`School`] and its [`Species`].
//!
//! Schools are owned by the population store. Everything downstream of
//! the store (predicates, views, classifiers, reports) only reads them.

use serde::{Deserialize, Serialize};

use crate::ids::{CellId, SchoolId, SpeciesId};

/// Trophic level assigned to a newly created school.
pub const INITIAL_TROPHIC_LEVEL: f64 = 3.0;

/// One tracked population unit: a cohort of fish of the same species
/// sharing age, size, and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    /// Unique school identifier.
    pub id: SchoolId,
    /// Species this school belongs to.
    pub species: SpeciesId,
    /// Age in simulation steps.
    pub age_steps: u32,
    /// Body length in centimeters.
    pub length: f64,
    /// Individual weight in grams.
    pub weight: f64,
    /// Trophic level of the individuals.
    pub trophic_level: f64,
    /// Number of individuals in the school.
    pub abundance: f64,
    /// Liveness flag. Dead schools stay in the store until removed.
    pub alive: bool,
    /// Whether the school is inside the simulated domain.
    pub in_domain: bool,
    /// Grid cell occupied by the school, `None` when unlocated.
    pub cell: Option<CellId>,
}

impl School {
    /// Create a living, in-domain, unlocated school of age zero.
    pub fn new(species: SpeciesId, length: f64, weight: f64, abundance: f64) -> Self {
        Self {
            id: SchoolId::new(),
            species,
            age_steps: 0,
            length,
            weight,
            trophic_level: INITIAL_TROPHIC_LEVEL,
            abundance,
            alive: true,
            in_domain: true,
            cell: None,
        }
    }

    /// Age in years given the number of steps per year.
    ///
    /// A zero `steps_per_year` is treated as one step per year.
    pub fn age_years(&self, steps_per_year: u32) -> f64 {
        f64::from(self.age_steps) / f64::from(steps_per_year.max(1))
    }

    /// Biomass of the school in tonnes.
    pub fn biomass(&self) -> f64 {
        self.abundance * self.weight * 1e-6
    }

    /// Whether the school has no cell on the grid.
    pub const fn is_unlocated(&self) -> bool {
        self.cell.is_none()
    }
}

/// A species declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// Dense species index.
    pub id: SpeciesId,
    /// Display name.
    pub name: String,
    /// Maximum age in years.
    pub lifespan_years: f64,
}

impl Species {
    /// Lifespan converted to simulation steps, rounded to the nearest step.
    ///
    /// Negative or non-finite lifespans yield zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn lifespan_steps(&self, steps_per_year: u32) -> u32 {
        let steps = (self.lifespan_years * f64::from(steps_per_year)).round();
        if steps.is_finite() && steps > 0.0 {
            steps.min(f64::from(u32::MAX)) as u32
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_school_is_alive_and_in_domain() {
        let school = School::new(SpeciesId(1), 12.0, 20.0, 1000.0);
        assert!(school.alive);
        assert!(school.in_domain);
        assert!(school.is_unlocated());
        assert_eq!(school.age_steps, 0);
        assert!((school.trophic_level - INITIAL_TROPHIC_LEVEL).abs() < f64::EPSILON);
    }

    #[test]
    fn age_in_years() {
        let mut school = School::new(SpeciesId(0), 5.0, 2.0, 10.0);
        school.age_steps = 36;
        assert!((school.age_years(24) - 1.5).abs() < 1e-12);
        assert!((school.age_years(0) - 36.0).abs() < 1e-12);
    }

    #[test]
    fn biomass_in_tonnes() {
        let school = School::new(SpeciesId(0), 5.0, 500.0, 2000.0);
        assert!((school.biomass() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lifespan_in_steps() {
        let species = Species {
            id: SpeciesId(0),
            name: String::from("anchovy"),
            lifespan_years: 4.0,
        };
        assert_eq!(species.lifespan_steps(24), 96);

        let broken = Species {
            lifespan_years: -1.0,
            ..species
        };
        assert_eq!(broken.lifespan_steps(24), 0);
    }
}
