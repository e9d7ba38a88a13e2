//! Serializable per-step summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shoal_types::{School, Species, SpeciesId};

use crate::error::OutputError;
use crate::histogram::ClassHistogram;
use crate::stage::StageTable;

/// Totals for one species over the reported schools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesSummary {
    /// Species index.
    pub species: SpeciesId,
    /// Display name.
    pub name: String,
    /// Number of schools.
    pub schools: usize,
    /// Number of individuals.
    pub abundance: f64,
    /// Biomass in tonnes.
    pub biomass: f64,
}

/// What one simulation step produced, rendered as one JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Step index the report describes.
    pub step: u64,
    /// Simulated year containing the step.
    pub year: u64,
    /// Step index within its year.
    pub step_in_year: u32,
    /// Number of living schools.
    pub alive_schools: usize,
    /// Per-species totals, in species order.
    pub species: Vec<SpeciesSummary>,
    /// Class tables filled for this step.
    pub histograms: Vec<ClassHistogram>,
    /// Stage counts, when stages are configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<StageTable>,
    /// Wall-clock time the report was built.
    pub generated_at: DateTime<Utc>,
}

impl StepReport {
    /// Summarize `schools` for step `step`.
    ///
    /// Schools of undeclared species count toward `alive_schools` but not
    /// toward any species summary.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn build<'a>(
        step: u64,
        steps_per_year: u32,
        species: &[Species],
        schools: impl IntoIterator<Item = &'a School>,
        histograms: Vec<ClassHistogram>,
    ) -> Self {
        let mut summaries: Vec<SpeciesSummary> = species
            .iter()
            .map(|sp| SpeciesSummary {
                species: sp.id,
                name: sp.name.clone(),
                schools: 0,
                abundance: 0.0,
                biomass: 0.0,
            })
            .collect();

        let mut alive_schools: usize = 0;
        for school in schools {
            alive_schools = alive_schools.saturating_add(1);
            if let Some(summary) = summaries.iter_mut().find(|s| s.species == school.species) {
                summary.schools = summary.schools.saturating_add(1);
                summary.abundance += school.abundance;
                summary.biomass += school.biomass();
            }
        }

        let per_year = u64::from(steps_per_year.max(1));
        Self {
            step,
            year: step.checked_div(per_year).unwrap_or_default(),
            step_in_year: step
                .checked_rem(per_year)
                .and_then(|s| u32::try_from(s).ok())
                .unwrap_or_default(),
            alive_schools,
            species: summaries,
            histograms,
            stages: None,
            generated_at: Utc::now(),
        }
    }

    /// Attach the stage counts of this step.
    #[must_use]
    pub fn with_stages(mut self, stages: StageTable) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Summary for `species`, if declared.
    pub fn summary(&self, species: SpeciesId) -> Option<&SpeciesSummary> {
        self.species.iter().find(|s| s.species == species)
    }

    /// Total biomass over all species summaries.
    pub fn total_biomass(&self) -> f64 {
        self.species.iter().map(|s| s.biomass).sum()
    }

    /// The report as a single JSON line, without a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Json`] if serialization fails.
    pub fn to_json_line(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string(self)?)
    }
}
