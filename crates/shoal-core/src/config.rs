//! Configuration loading and typed config structures for the Shoal
//! simulation.
//!
//! The canonical configuration lives in `shoal-config.yaml` at the project
//! root. Run-level settings map onto typed sections; model parameters
//! (species declarations, distribution bounds, stage thresholds) live in
//! a flat `parameters:` mapping that is converted into a
//! [`Parameters`] table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shoal_types::{ParameterError, ParameterLookup, Parameters, Species, SpeciesId};

/// Environment variable overriding `output.directory`.
pub const OUTPUT_DIR_ENV: &str = "SHOAL_OUTPUT_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A model parameter is missing or malformed.
    #[error("parameter error: {source}")]
    Parameter {
        /// The underlying lookup error.
        #[from]
        source: ParameterError,
    },

    /// A species declaration key does not end in `.sp<index>`.
    #[error("malformed species key: {key}")]
    SpeciesKey {
        /// The offending key.
        key: String,
    },

    /// A typed setting is out of range.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted path of the setting.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `shoal-config.yaml`. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Run-level settings (name, seed, duration, time step).
    #[serde(default)]
    pub simulation: RunConfig,

    /// Seed population settings.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Report output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Flat model parameters, keyed case-insensitively.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_yml::Value>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `SHOAL_OUTPUT_DIR` overrides `output.directory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a setting is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.output.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a setting is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.steps_per_year == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.steps_per_year",
                reason: "must be at least 1",
            });
        }
        let [low, high] = self.population.initial_length_cm;
        if !(low.is_finite() && high.is_finite() && low > 0.0 && low <= high) {
            return Err(ConfigError::Invalid {
                field: "population.initial_length_cm",
                reason: "expected 0 < min <= max",
            });
        }
        if !(0.0..=1.0).contains(&self.population.out_of_domain_fraction) {
            return Err(ConfigError::Invalid {
                field: "population.out_of_domain_fraction",
                reason: "expected a fraction in [0, 1]",
            });
        }
        Ok(())
    }

    /// The `parameters:` mapping as a lookup table.
    ///
    /// Scalars are stored as their textual form; sequences are joined
    /// with `;` so they read back through
    /// [`get_array_double`](ParameterLookup::get_array_double). Nested
    /// mappings are skipped.
    pub fn parameters(&self) -> Parameters {
        self.parameters
            .iter()
            .filter_map(|(key, value)| scalar_text(value).map(|text| (key.as_str(), text)))
            .collect()
    }
}

fn scalar_text(value: &serde_yml::Value) -> Option<String> {
    use serde_yml::Value;
    match value {
        Value::Null => Some("null".to_owned()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(items) => {
            let parts: Option<Vec<String>> = items.iter().map(scalar_text).collect();
            parts.map(|parts| parts.join(";"))
        }
        Value::Mapping(_) => None,
        Value::Tagged(tagged) => scalar_text(&tagged.value),
    }
}

/// Declared species, read from `species.name.sp<i>` and
/// `species.lifespan.sp<i>` (years), in index order.
///
/// # Errors
///
/// Returns [`ConfigError::SpeciesKey`] if a name key has no numeric
/// `.sp<i>` suffix, or [`ConfigError::Parameter`] if a lifespan is
/// missing or unparsable.
pub fn species_from_parameters(parameters: &dyn ParameterLookup) -> Result<Vec<Species>, ConfigError> {
    let mut species = Vec::new();
    for key in parameters.find_keys("species.name.sp*") {
        let id = key
            .rsplit_once(".sp")
            .and_then(|(_, index)| index.parse::<u16>().ok())
            .map(SpeciesId)
            .ok_or_else(|| ConfigError::SpeciesKey { key: key.clone() })?;
        let name = parameters.get_string(&key)?.to_owned();
        let lifespan_years = parameters.get_double(&format!("species.lifespan.{}", id.key_suffix()))?;
        species.push(Species {
            id,
            name,
            lifespan_years,
        });
    }
    species.sort_by_key(|sp| sp.id);
    Ok(species)
}

/// Run-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Random seed for the seed population.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of steps to run (0 = until extinction).
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,

    /// Steps in one simulated year.
    #[serde(default = "default_steps_per_year")]
    pub steps_per_year: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: default_seed(),
            max_steps: default_max_steps(),
            steps_per_year: default_steps_per_year(),
        }
    }
}

/// Seed population configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Schools spawned per declared species.
    #[serde(default = "default_initial_schools")]
    pub initial_schools_per_species: u32,

    /// `[min, max]` body length of spawned schools, in centimeters.
    #[serde(default = "default_initial_length_cm")]
    pub initial_length_cm: [f64; 2],

    /// Individuals per spawned school.
    #[serde(default = "default_initial_abundance")]
    pub initial_abundance: f64,

    /// Fraction of spawned schools placed outside the domain.
    #[serde(default)]
    pub out_of_domain_fraction: f64,

    /// Number of grid cells in-domain schools are spread over
    /// (0 = leave them unlocated).
    #[serde(default = "default_grid_cells")]
    pub grid_cells: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_schools_per_species: default_initial_schools(),
            initial_length_cm: default_initial_length_cm(),
            initial_abundance: default_initial_abundance(),
            out_of_domain_fraction: 0.0,
            grid_cells: default_grid_cells(),
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Whether step reports are written.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory receiving `reports.jsonl`.
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Schools younger than this many years are left out of the
    /// histograms.
    #[serde(default)]
    pub cutoff_age_years: u32,

    /// Parameter key prefix of the stage thresholds counted in each
    /// report (`<key>.threshold.sp<i>`, `<key>.structure`). No stage
    /// table when unset.
    #[serde(default)]
    pub stage_key: Option<String>,
}

impl OutputConfig {
    /// Apply `SHOAL_OUTPUT_DIR` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(OUTPUT_DIR_ENV) {
            self.directory = PathBuf::from(val);
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_output_directory(),
            cutoff_age_years: 0,
            stage_key: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_name() -> String {
    "shoal".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_max_steps() -> u64 {
    240
}

const fn default_steps_per_year() -> u32 {
    24
}

const fn default_initial_schools() -> u32 {
    20
}

const fn default_initial_length_cm() -> [f64; 2] {
    [2.0, 30.0]
}

const fn default_initial_abundance() -> f64 {
    10_000.0
}

const fn default_grid_cells() -> u32 {
    100
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
