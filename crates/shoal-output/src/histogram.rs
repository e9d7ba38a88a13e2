//! Species x class aggregation tables.
//!
//! A [`ClassHistogram`] holds one [`Distribution`] per species and sums the
//! abundance and biomass of the schools it is fed into per-class rows.

use std::collections::BTreeMap;

use serde::Serialize;
use shoal_population::{Population, ViewGraph};
use shoal_types::{DistributionType, ParameterLookup, School, Species, SpeciesId, ViewId};

use crate::distribution::{Distribution, DistributionDefaults, DistributionScope};
use crate::error::OutputError;

/// Per-class totals for one species.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassRow {
    /// Species the row aggregates.
    pub species: SpeciesId,
    /// Lower boundary of each class.
    pub thresholds: Vec<f64>,
    /// Number of individuals per class.
    pub abundance: Vec<f64>,
    /// Biomass in tonnes per class.
    pub biomass: Vec<f64>,
    /// Schools recorded below the first boundary.
    pub below_range_schools: usize,
    /// Individuals recorded below the first boundary.
    pub below_range_abundance: f64,
    /// Biomass recorded below the first boundary.
    pub below_range_biomass: f64,
}

impl ClassRow {
    fn empty(species: SpeciesId, distribution: &Distribution) -> Self {
        let n = distribution.class_count();
        Self {
            species,
            thresholds: distribution.thresholds().to_vec(),
            abundance: vec![0.0; n],
            biomass: vec![0.0; n],
            below_range_schools: 0,
            below_range_abundance: 0.0,
            below_range_biomass: 0.0,
        }
    }

    fn reset(&mut self) {
        self.abundance.iter_mut().for_each(|v| *v = 0.0);
        self.biomass.iter_mut().for_each(|v| *v = 0.0);
        self.below_range_schools = 0;
        self.below_range_abundance = 0.0;
        self.below_range_biomass = 0.0;
    }

    /// Total abundance including the below-range tally.
    pub fn total_abundance(&self) -> f64 {
        self.abundance.iter().sum::<f64>() + self.below_range_abundance
    }
}

/// Abundance and biomass of a set of schools, bucketed by species and class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassHistogram {
    kind: DistributionType,
    rows: Vec<ClassRow>,
    /// Schools whose species has no row.
    unclassified: usize,
    #[serde(skip)]
    distributions: BTreeMap<SpeciesId, Distribution>,
}

impl ClassHistogram {
    /// Build an empty histogram with one species-scoped distribution per
    /// declared species.
    ///
    /// # Errors
    ///
    /// Propagates distribution initialization errors.
    pub fn init(
        kind: DistributionType,
        species: &[Species],
        parameters: &dyn ParameterLookup,
        defaults: &DistributionDefaults,
    ) -> Result<Self, OutputError> {
        let mut distributions = BTreeMap::new();
        for sp in species {
            let distribution =
                Distribution::init(DistributionScope::Species(sp.id), kind, parameters, defaults)?;
            distributions.insert(sp.id, distribution);
        }
        let rows = distributions
            .iter()
            .map(|(&id, distribution)| ClassRow::empty(id, distribution))
            .collect();
        Ok(Self {
            kind,
            rows,
            unclassified: 0,
            distributions,
        })
    }

    /// Add one school to its species row.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn record(&mut self, school: &School, steps_per_year: u32) {
        let (Some(distribution), Some(row)) = (
            self.distributions.get(&school.species),
            self.rows.iter_mut().find(|row| row.species == school.species),
        ) else {
            self.unclassified = self.unclassified.saturating_add(1);
            return;
        };

        let biomass = school.biomass();
        let class = distribution.class_of_school(school, steps_per_year);
        let slot = usize::try_from(class)
            .ok()
            .and_then(|i| row.abundance.get_mut(i).zip(row.biomass.get_mut(i)));
        match slot {
            Some((abundance, mass)) => {
                *abundance += school.abundance;
                *mass += biomass;
            }
            None => {
                row.below_range_schools = row.below_range_schools.saturating_add(1);
                row.below_range_abundance += school.abundance;
                row.below_range_biomass += biomass;
            }
        }
    }

    /// Add every school yielded by `schools`.
    pub fn record_all<'a>(&mut self, schools: impl IntoIterator<Item = &'a School>, steps_per_year: u32) {
        for school in schools {
            self.record(school, steps_per_year);
        }
    }

    /// Add the current members of `view`. The view is not refreshed first.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Population`] if `view` is not in `graph`.
    pub fn record_view(
        &mut self,
        graph: &ViewGraph,
        view: ViewId,
        population: &Population,
        steps_per_year: u32,
    ) -> Result<usize, OutputError> {
        let schools = graph.schools(view, population)?;
        let count = schools.len();
        self.record_all(schools, steps_per_year);
        Ok(count)
    }

    /// Zero every row.
    pub fn reset(&mut self) {
        self.rows.iter_mut().for_each(ClassRow::reset);
        self.unclassified = 0;
    }

    /// Attribute the histogram classifies on.
    pub const fn kind(&self) -> DistributionType {
        self.kind
    }

    /// Row for `species`, if declared.
    pub fn row(&self, species: SpeciesId) -> Option<&ClassRow> {
        self.rows.iter().find(|row| row.species == species)
    }

    /// All rows in species order.
    pub fn rows(&self) -> &[ClassRow] {
        &self.rows
    }

    /// Schools recorded for species without a row.
    pub const fn unclassified(&self) -> usize {
        self.unclassified
    }

    /// Distribution used for `species`.
    pub fn distribution(&self, species: SpeciesId) -> Option<&Distribution> {
        self.distributions.get(&species)
    }
}
