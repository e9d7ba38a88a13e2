//! Enumeration types for the Shoal simulation.

use serde::{Deserialize, Serialize};

/// The school attribute a distribution discretizes into classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DistributionType {
    /// Age discretization in years.
    Age,
    /// Length discretization in centimeters.
    Size,
    /// Weight discretization in grams.
    Weight,
    /// Trophic level discretization.
    Tl,
}

impl DistributionType {
    /// Every distribution kind, in reporting order.
    pub const ALL: [Self; 4] = [Self::Age, Self::Size, Self::Weight, Self::Tl];

    /// Name used in configuration keys, e.g. `output.distrib.bySize.min`.
    pub const fn key_name(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Size => "Size",
            Self::Weight => "Weight",
            Self::Tl => "TL",
        }
    }

    /// Human-readable description used in report headers.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Age => "Age class (year)",
            Self::Size => "Size class (cm)",
            Self::Weight => "Weight class (g)",
            Self::Tl => "Trophic level",
        }
    }
}

impl core::fmt::Display for DistributionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key_name())
    }
}
