//! Class distributions: mapping a continuous school attribute to a class
//! index.
//!
//! Boundaries are resolved once at initialization, in priority order:
//!
//! 1. species override `output.distrib.by<Kind>.{min,max,incr}.sp<i>`
//! 2. global override `output.distrib.by<Kind>.{min,max,incr}`
//! 3. the hardcoded default for the kind
//!
//! A source is used only when all three of its keys are non-null, so a
//! partial override falls through to the next source.
//!
//! With `n = ceil((max - min) / incr)` classes the boundaries are
//! `min, min + incr, ..., min + (n - 1) * incr`. The last boundary is not
//! clamped to `max`: the top class is open-ended. Values below the first
//! boundary map to [`BELOW_RANGE`].

use std::collections::BTreeMap;

use shoal_types::{DistributionType, ParameterLookup, School, SpeciesId};
use tracing::debug;

use crate::error::OutputError;

/// Class index returned for values below the first boundary.
pub const BELOW_RANGE: isize = -1;

/// Largest number of classes a single distribution may hold.
pub const MAX_CLASSES: usize = 100_000;

/// Prefix of every distribution parameter key.
const KEY_PREFIX: &str = "output.distrib.by";

/// Which entity group a distribution is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistributionScope {
    /// Shared by all species.
    Global,
    /// One species, allowed its own `.sp<i>` override.
    Species(SpeciesId),
}

/// Where the boundaries of a distribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsSource {
    /// The species-specific override.
    Species,
    /// The global override for the kind.
    Global,
    /// The hardcoded default for the kind.
    Default,
}

/// The `(min, max, increment)` triple a distribution is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionBounds {
    /// First boundary.
    pub min: f64,
    /// Nominal upper bound; not itself a boundary unless reached exactly.
    pub max: f64,
    /// Distance between consecutive boundaries.
    pub increment: f64,
}

/// Hardcoded fallback bounds for each distribution kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionDefaults {
    bounds: BTreeMap<DistributionType, DistributionBounds>,
}

impl DistributionDefaults {
    /// Fallback bounds for `kind`.
    pub fn get(&self, kind: DistributionType) -> DistributionBounds {
        self.bounds
            .get(&kind)
            .copied()
            .unwrap_or_else(|| builtin_bounds(kind))
    }

    /// Replace the fallback bounds for `kind`.
    pub fn set(&mut self, kind: DistributionType, bounds: DistributionBounds) {
        self.bounds.insert(kind, bounds);
    }
}

impl Default for DistributionDefaults {
    fn default() -> Self {
        Self {
            bounds: DistributionType::ALL
                .iter()
                .map(|&kind| (kind, builtin_bounds(kind)))
                .collect(),
        }
    }
}

const fn builtin_bounds(kind: DistributionType) -> DistributionBounds {
    let (min, max, increment) = match kind {
        DistributionType::Age => (1.0, 25.0, 1.0),
        DistributionType::Size => (10.0, 200.0, 10.0),
        DistributionType::Weight => (25.0, 2000.0, 25.0),
        DistributionType::Tl => (1.0, 6.0, 0.1),
    };
    DistributionBounds {
        min,
        max,
        increment,
    }
}

/// The attribute of `school` that `kind` discretizes.
pub fn measure(kind: DistributionType, school: &School, steps_per_year: u32) -> f64 {
    match kind {
        DistributionType::Age => school.age_years(steps_per_year),
        DistributionType::Size => school.length,
        DistributionType::Weight => school.weight,
        DistributionType::Tl => school.trophic_level,
    }
}

/// An immutable, ascending list of class boundaries for one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    kind: DistributionType,
    scope: DistributionScope,
    source: BoundsSource,
    boundaries: Vec<f64>,
}

impl Distribution {
    /// Resolve bounds for `scope` and `kind` from `parameters`, falling
    /// back to `defaults`, and build the boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Parameter`] if a non-null key holds an
    /// unparsable value, or [`OutputError::InvalidIncrement`] if the
    /// resolved increment is not a positive finite number.
    pub fn init(
        scope: DistributionScope,
        kind: DistributionType,
        parameters: &dyn ParameterLookup,
        defaults: &DistributionDefaults,
    ) -> Result<Self, OutputError> {
        let species_keys = match scope {
            DistributionScope::Species(species) => Some(bound_keys(kind, Some(species))),
            DistributionScope::Global => None,
        };
        let global_keys = bound_keys(kind, None);

        let (bounds, source) = match species_keys {
            Some(keys) if all_present(parameters, &keys) => {
                (read_bounds(parameters, &keys)?, BoundsSource::Species)
            }
            _ if all_present(parameters, &global_keys) => {
                (read_bounds(parameters, &global_keys)?, BoundsSource::Global)
            }
            _ => (defaults.get(kind), BoundsSource::Default),
        };

        let distribution = Self::from_bounds(scope, kind, bounds, source)?;
        debug!(
            kind = %kind,
            scope = ?scope,
            source = ?source,
            classes = distribution.class_count(),
            "Distribution initialized"
        );
        Ok(distribution)
    }

    /// Build boundaries directly from resolved bounds.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::InvalidIncrement`] if `bounds.increment` is
    /// not a positive finite number, and [`OutputError::TooManyClasses`]
    /// if the bounds span more than [`MAX_CLASSES`] classes.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_bounds(
        scope: DistributionScope,
        kind: DistributionType,
        bounds: DistributionBounds,
        source: BoundsSource,
    ) -> Result<Self, OutputError> {
        let DistributionBounds {
            min,
            max,
            increment,
        } = bounds;
        if !increment.is_finite() || increment <= 0.0 {
            return Err(OutputError::InvalidIncrement { kind, increment });
        }

        let span = ((max - min) / increment).ceil();
        if span > MAX_CLASSES as f64 {
            return Err(OutputError::TooManyClasses {
                kind,
                classes: span,
                limit: MAX_CLASSES,
            });
        }
        let n_classes = if span.is_finite() && span > 0.0 {
            span as usize
        } else {
            0
        };
        let boundaries = (0..n_classes)
            .map(|i| min + i as f64 * increment)
            .collect();

        Ok(Self {
            kind,
            scope,
            source,
            boundaries,
        })
    }

    /// Class index of `value`.
    ///
    /// Returns the index of the highest boundary `<= value`. Values at or
    /// above the last boundary (and NaN) fall in the open top class;
    /// values below the first boundary return [`BELOW_RANGE`], as does
    /// every value when there are no classes.
    pub fn class_of(&self, value: f64) -> isize {
        let Some(&last) = self.boundaries.last() else {
            return BELOW_RANGE;
        };
        let top = self.boundaries.len().saturating_sub(1);
        let index = if value.is_nan() || value > last {
            Some(top)
        } else {
            self.boundaries.iter().rposition(|&boundary| value >= boundary)
        };
        index.map_or(BELOW_RANGE, |i| isize::try_from(i).unwrap_or(isize::MAX))
    }

    /// Class index of `school` for this distribution's attribute.
    pub fn class_of_school(&self, school: &School, steps_per_year: u32) -> isize {
        self.class_of(measure(self.kind, school, steps_per_year))
    }

    /// Lower boundary of class `index`.
    pub fn threshold(&self, index: usize) -> Option<f64> {
        self.boundaries.get(index).copied()
    }

    /// All boundaries in ascending order.
    pub fn thresholds(&self) -> &[f64] {
        &self.boundaries
    }

    /// Number of classes.
    pub fn class_count(&self) -> usize {
        self.boundaries.len()
    }

    /// The attribute this distribution classifies.
    pub const fn kind(&self) -> DistributionType {
        self.kind
    }

    /// The entity group this distribution was configured for.
    pub const fn scope(&self) -> DistributionScope {
        self.scope
    }

    /// Which configuration source supplied the bounds.
    pub const fn source(&self) -> BoundsSource {
        self.source
    }
}

/// The `min`, `max`, and `incr` keys for `kind`, optionally species-scoped.
fn bound_keys(kind: DistributionType, species: Option<SpeciesId>) -> [String; 3] {
    let suffix = species.map(|sp| format!(".{}", sp.key_suffix())).unwrap_or_default();
    ["min", "max", "incr"].map(|bound| format!("{KEY_PREFIX}{}.{bound}{suffix}", kind.key_name()))
}

fn all_present(parameters: &dyn ParameterLookup, keys: &[String; 3]) -> bool {
    keys.iter().all(|key| !parameters.is_null(key))
}

fn read_bounds(
    parameters: &dyn ParameterLookup,
    [min, max, incr]: &[String; 3],
) -> Result<DistributionBounds, OutputError> {
    Ok(DistributionBounds {
        min: parameters.get_double(min)?,
        max: parameters.get_double(max)?,
        increment: parameters.get_double(incr)?,
    })
}
