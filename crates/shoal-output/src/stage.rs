//! Explicit stage thresholds per species.
//!
//! A stage key such as `output.diet.stage` declares, for each species, an
//! ascending threshold list `<key>.threshold.sp<i>` and the attribute it
//! applies to, `<key>.structure.sp<i>` (falling back to `<key>.structure`).
//! `N` thresholds give `N + 1` stages; a school's stage is the number of
//! thresholds its attribute reaches.
//!
//! [`SchoolStage::tabulate`] counts a set of schools per species and
//! stage into a serializable [`StageTable`].

use std::collections::BTreeMap;

use serde::Serialize;
use shoal_types::{DistributionType, ParameterLookup, School, Species, SpeciesId};
use tracing::debug;

use crate::distribution::measure;
use crate::error::OutputError;

#[derive(Debug, Clone, PartialEq)]
struct SpeciesStages {
    kind: DistributionType,
    thresholds: Vec<f64>,
}

/// Per-species stage classification under one configuration key.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolStage {
    key: String,
    tables: BTreeMap<SpeciesId, SpeciesStages>,
}

/// Schools and individuals of one species per stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRow {
    /// Species index.
    pub species: SpeciesId,
    /// Attribute the stages are measured on, if configured.
    pub kind: Option<DistributionType>,
    /// Stage thresholds.
    pub thresholds: Vec<f64>,
    /// School count per stage.
    pub schools: Vec<usize>,
    /// Abundance per stage.
    pub abundance: Vec<f64>,
}

/// Stage counts of one step, one row per species.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTable {
    /// Configuration key the stages were read from.
    pub key: String,
    /// Column headers, one per species stage.
    pub headers: Vec<String>,
    /// Rows in species order.
    pub rows: Vec<StageRow>,
}

impl StageTable {
    /// Row of `species`, if declared.
    pub fn row(&self, species: SpeciesId) -> Option<&StageRow> {
        self.rows.iter().find(|row| row.species == species)
    }
}

impl SchoolStage {
    /// Read thresholds and structures for every species in `species`.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Parameter`] if the structure key is missing
    /// or a threshold list is unparsable, and
    /// [`OutputError::UnknownStructure`] for a structure other than `age`,
    /// `size`, `weight`, or `tl`.
    pub fn init(
        key: &str,
        species: &[Species],
        parameters: &dyn ParameterLookup,
    ) -> Result<Self, OutputError> {
        let mut tables = BTreeMap::new();
        for sp in species {
            let suffix = sp.id.key_suffix();

            let threshold_key = format!("{key}.threshold.{suffix}");
            let thresholds = if parameters.is_null(&threshold_key) {
                Vec::new()
            } else {
                parameters.get_array_double(&threshold_key)?
            };

            let species_structure = format!("{key}.structure.{suffix}");
            let structure_key = if parameters.is_null(&species_structure) {
                format!("{key}.structure")
            } else {
                species_structure
            };
            let structure = parameters.get_string(&structure_key)?;
            let kind = parse_structure(structure).ok_or_else(|| OutputError::UnknownStructure {
                key: structure_key.clone(),
                value: structure.to_owned(),
            })?;

            debug!(
                key,
                species = %sp.id,
                structure = %kind,
                stages = thresholds.len().saturating_add(1),
                "Stage thresholds loaded"
            );
            tables.insert(sp.id, SpeciesStages { kind, thresholds });
        }

        Ok(Self {
            key: key.to_owned(),
            tables,
        })
    }

    /// Stage of `school`: the number of its species' thresholds that its
    /// attribute reaches. Species without thresholds, or not loaded,
    /// always yield stage 0.
    pub fn stage_of(&self, school: &School, steps_per_year: u32) -> usize {
        let Some(table) = self.tables.get(&school.species) else {
            return 0;
        };
        let value = measure(table.kind, school, steps_per_year);
        table
            .thresholds
            .iter()
            .take_while(|&&threshold| value >= threshold)
            .count()
    }

    /// Number of stages for `species` (thresholds plus one).
    pub fn stage_count(&self, species: SpeciesId) -> usize {
        self.thresholds(species).len().saturating_add(1)
    }

    /// Threshold list for `species`, empty if none were configured.
    pub fn thresholds(&self, species: SpeciesId) -> &[f64] {
        self.tables
            .get(&species)
            .map(|table| table.thresholds.as_slice())
            .unwrap_or(&[])
    }

    /// Attribute the stages of `species` are measured on.
    pub fn kind(&self, species: SpeciesId) -> Option<DistributionType> {
        self.tables.get(&species).map(|table| table.kind)
    }

    /// Total number of stage columns across all loaded species.
    pub fn column_count(&self) -> usize {
        self.tables
            .keys()
            .map(|&species| self.stage_count(species))
            .sum()
    }

    /// Column headers, one per species stage, in species order.
    ///
    /// A species with a single stage is labelled by name alone; otherwise
    /// each stage reads `name [lower, upper[`, the last one open-ended.
    pub fn headers(&self, species: &[Species]) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.column_count());
        for sp in species {
            let thresholds = self.thresholds(sp.id);
            if thresholds.is_empty() {
                headers.push(sp.name.clone());
                continue;
            }
            let lowers = std::iter::once(0.0).chain(thresholds.iter().copied());
            let uppers = thresholds.iter().map(|t| format!("{t}")).chain(std::iter::once("inf".to_owned()));
            headers.extend(
                lowers
                    .zip(uppers)
                    .map(|(lower, upper)| format!("{} [{lower}, {upper}[", sp.name)),
            );
        }
        headers
    }

    /// Count `schools` per species and stage.
    ///
    /// Schools of species missing from `species` are skipped.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn tabulate<'a>(
        &self,
        species: &[Species],
        schools: impl IntoIterator<Item = &'a School>,
        steps_per_year: u32,
    ) -> StageTable {
        let mut rows: Vec<StageRow> = species
            .iter()
            .map(|sp| {
                let stages = self.stage_count(sp.id);
                StageRow {
                    species: sp.id,
                    kind: self.kind(sp.id),
                    thresholds: self.thresholds(sp.id).to_vec(),
                    schools: vec![0; stages],
                    abundance: vec![0.0; stages],
                }
            })
            .collect();

        for school in schools {
            let stage = self.stage_of(school, steps_per_year);
            let Some(row) = rows.iter_mut().find(|row| row.species == school.species) else {
                continue;
            };
            if let Some(count) = row.schools.get_mut(stage) {
                *count = count.saturating_add(1);
            }
            if let Some(abundance) = row.abundance.get_mut(stage) {
                *abundance += school.abundance;
            }
        }

        StageTable {
            key: self.key.clone(),
            headers: self.headers(species),
            rows,
        }
    }

    /// The configuration key this stage set was read from.
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn parse_structure(value: &str) -> Option<DistributionType> {
    match value.trim().to_ascii_lowercase().as_str() {
        "age" => Some(DistributionType::Age),
        "size" => Some(DistributionType::Size),
        "weight" => Some(DistributionType::Weight),
        "tl" => Some(DistributionType::Tl),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use shoal_types::Parameters;

    use super::*;

    const KEY: &str = "output.diet.stage";

    fn species() -> Vec<Species> {
        ["cod", "sole", "herring"]
            .into_iter()
            .zip(0_u16..)
            .map(|(name, i)| Species {
                id: SpeciesId(i),
                name: name.to_owned(),
                lifespan_years: 10.0,
            })
            .collect()
    }

    fn params() -> Parameters {
        [
            ("output.diet.stage.structure", "size"),
            ("output.diet.stage.threshold.sp0", "5;10;30"),
            ("output.diet.stage.threshold.sp1", "null"),
            ("output.diet.stage.structure.sp2", "age"),
            ("output.diet.stage.threshold.sp2", "2, 4, 6"),
        ]
        .into_iter()
        .collect()
    }

    fn school(species: u16, length: f64, age_steps: u32) -> School {
        let mut school = School::new(SpeciesId(species), length, 1.0, 1.0);
        school.age_steps = age_steps;
        school
    }

    #[test]
    fn size_stages_with_edges() {
        let stages = SchoolStage::init(KEY, &species(), &params());
        assert!(stages.is_ok());
        if let Ok(stages) = stages {
            let cases = [(3.0, 0), (7.0, 1), (12.0, 2), (35.0, 3), (5.0, 1), (10.0, 2), (30.0, 3)];
            for (length, expected) in cases {
                assert_eq!(stages.stage_of(&school(0, length, 0), 1), expected, "length {length}");
            }
            assert_eq!(stages.stage_count(SpeciesId(0)), 4);
            assert_eq!(stages.kind(SpeciesId(0)), Some(DistributionType::Size));
        }
    }

    #[test]
    fn null_thresholds_mean_single_stage() {
        let stages = SchoolStage::init(KEY, &species(), &params());
        assert!(stages.is_ok());
        if let Ok(stages) = stages {
            assert_eq!(stages.stage_count(SpeciesId(1)), 1);
            for length in [0.0, 5.0, 100.0] {
                assert_eq!(stages.stage_of(&school(1, length, 0), 1), 0);
            }
        }
    }

    #[test]
    fn species_structure_overrides_global() {
        let stages = SchoolStage::init(KEY, &species(), &params());
        assert!(stages.is_ok());
        if let Ok(stages) = stages {
            assert_eq!(stages.kind(SpeciesId(2)), Some(DistributionType::Age));
            // Four steps per year: 12 steps is 3 years.
            assert_eq!(stages.stage_of(&school(2, 50.0, 12), 4), 1);
            assert_eq!(stages.stage_of(&school(2, 50.0, 16), 4), 2);
            assert_eq!(stages.stage_of(&school(2, 50.0, 40), 4), 3);
        }
    }

    #[test]
    fn unknown_species_is_stage_zero() {
        let stages = SchoolStage::init(KEY, &species(), &params());
        assert!(stages.is_ok_and(|s| s.stage_of(&school(9, 100.0, 0), 1) == 0));
    }

    #[test]
    fn headers_label_intervals() {
        let sp = species();
        let stages = SchoolStage::init(KEY, &sp, &params());
        assert!(stages.is_ok());
        if let Ok(stages) = stages {
            let headers = stages.headers(&sp);
            assert_eq!(stages.column_count(), headers.len());
            assert_eq!(headers.first().map(String::as_str), Some("cod [0, 5["));
            assert!(headers.contains(&"cod [30, inf[".to_owned()));
            assert!(headers.contains(&"sole".to_owned()));
            assert!(headers.contains(&"herring [2, 4[".to_owned()));
        }
    }

    #[test]
    fn tabulate_counts_schools_per_stage() {
        let sp = species();
        let stages = SchoolStage::init(KEY, &sp, &params());
        assert!(stages.is_ok());
        let Ok(stages) = stages else { return };

        let mut schools = vec![
            school(0, 3.0, 0),
            school(0, 12.0, 0),
            school(0, 11.0, 0),
            school(1, 40.0, 0),
            school(7, 40.0, 0),
        ];
        if let Some(s) = schools.get_mut(1) {
            s.abundance = 4.0;
        }
        let table = stages.tabulate(&sp, &schools, 1);

        assert_eq!(table.key, KEY);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.headers.len(), stages.column_count());
        let cod = table.row(SpeciesId(0));
        assert!(cod.is_some());
        if let Some(cod) = cod {
            assert_eq!(cod.schools, vec![1, 0, 2, 0]);
            assert!(cod.abundance.get(2).is_some_and(|a| (a - 5.0).abs() < 1e-12));
            assert_eq!(cod.kind, Some(DistributionType::Size));
        }
        assert_eq!(table.row(SpeciesId(1)).map(|r| r.schools.clone()), Some(vec![1]));
        assert_eq!(table.row(SpeciesId(2)).map(|r| r.schools.iter().sum::<usize>()), Some(0));
    }

    #[test]
    fn unknown_structure_is_rejected() {
        let params: Parameters = [("output.diet.stage.structure", "girth")].into_iter().collect();
        let result = SchoolStage::init(KEY, &species(), &params);
        assert!(matches!(result, Err(OutputError::UnknownStructure { .. })));
    }

    #[test]
    fn missing_structure_is_a_parameter_error() {
        let result = SchoolStage::init(KEY, &species(), &Parameters::new());
        assert!(matches!(result, Err(OutputError::Parameter { .. })));
    }
}
