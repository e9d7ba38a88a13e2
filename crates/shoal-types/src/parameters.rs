//! Keyed scalar parameter lookup.
//!
//! [`ParameterLookup`] is the narrow read interface every configurable
//! component receives at construction. [`Parameters`] is the in-memory
//! implementation: a flat map of lower-cased keys to raw string values.
//!
//! Per-scope overrides follow the suffix convention `<base>.<scope>`, e.g.
//! `output.distrib.bySize.min.sp2` overrides `output.distrib.bySize.min`
//! for species 2. Keys are matched case-insensitively.

use std::collections::BTreeMap;

use crate::error::ParameterError;

/// Read access to keyed configuration values.
///
/// Only [`raw`](ParameterLookup::raw) and
/// [`find_keys`](ParameterLookup::find_keys) must be provided; the typed
/// getters parse the raw value.
pub trait ParameterLookup {
    /// The raw string value stored under `key`, if any.
    fn raw(&self, key: &str) -> Option<&str>;

    /// All keys matching a glob pattern (`*` matches any run of
    /// characters, `?` exactly one), in ascending key order.
    fn find_keys(&self, pattern: &str) -> Vec<String>;

    /// Whether `key` is missing, empty, or the literal `null`.
    fn is_null(&self, key: &str) -> bool {
        self.raw(key)
            .is_none_or(|value| value.trim().is_empty() || value.trim().eq_ignore_ascii_case("null"))
    }

    /// The trimmed string value of `key`.
    fn get_string(&self, key: &str) -> Result<&str, ParameterError> {
        if self.is_null(key) {
            return Err(ParameterError::Missing {
                key: key.to_owned(),
            });
        }
        self.raw(key).map(str::trim).ok_or_else(|| ParameterError::Missing {
            key: key.to_owned(),
        })
    }

    /// The value of `key` parsed as a double-precision float.
    fn get_double(&self, key: &str) -> Result<f64, ParameterError> {
        let value = self.get_string(key)?;
        value.parse::<f64>().map_err(|err| invalid(key, value, "f64", &err))
    }

    /// The value of `key` parsed as a single-precision float.
    fn get_float(&self, key: &str) -> Result<f32, ParameterError> {
        let value = self.get_string(key)?;
        value.parse::<f32>().map_err(|err| invalid(key, value, "f32", &err))
    }

    /// The value of `key` parsed as an integer.
    fn get_int(&self, key: &str) -> Result<i64, ParameterError> {
        let value = self.get_string(key)?;
        value.parse::<i64>().map_err(|err| invalid(key, value, "integer", &err))
    }

    /// The value of `key` parsed as a list of floats separated by commas
    /// or semicolons.
    fn get_array_double(&self, key: &str) -> Result<Vec<f64>, ParameterError> {
        let value = self.get_string(key)?;
        value
            .split([',', ';'])
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<f64>()
                    .map_err(|err| invalid(key, value, "list of f64", &err))
            })
            .collect()
    }
}

fn invalid(
    key: &str,
    value: &str,
    expected: &'static str,
    reason: &dyn core::fmt::Display,
) -> ParameterError {
    ParameterError::Invalid {
        key: key.to_owned(),
        value: value.to_owned(),
        expected,
        reason: reason.to_string(),
    }
}

/// In-memory parameter set with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: BTreeMap<String, String>,
}

impl Parameters {
    /// Create an empty parameter set.
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Insert or replace a parameter. Returns the previous value, if any.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.to_ascii_lowercase(), value.into())
    }

    /// Number of stored parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameter is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Self::new();
        for (key, value) in iter {
            parameters.insert(key.as_ref(), value);
        }
        parameters
    }
}

impl ParameterLookup for Parameters {
    fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    fn find_keys(&self, pattern: &str) -> Vec<String> {
        let pattern: Vec<char> = pattern.to_ascii_lowercase().chars().collect();
        self.values
            .keys()
            .filter(|key| {
                let key: Vec<char> = key.chars().collect();
                glob_match(&pattern, &key)
            })
            .cloned()
            .collect()
    }
}

/// Iterative glob matcher supporting `*` and `?`.
///
/// Backtracks to the most recent `*` on mismatch, which keeps the match
/// linear in practice for configuration-sized keys.
fn glob_match(pattern: &[char], text: &[char]) -> bool {
    let mut p = 0_usize;
    let mut t = 0_usize;
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match (pattern.get(p), text.get(t)) {
            (Some('*'), _) => {
                star = Some((p, t));
                p = p.saturating_add(1);
            }
            (Some(pc), Some(tc)) if *pc == '?' || pc == tc => {
                p = p.saturating_add(1);
                t = t.saturating_add(1);
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    let resume = star_t.saturating_add(1);
                    star = Some((star_p, resume));
                    p = star_p.saturating_add(1);
                    t = resume;
                }
                None => return false,
            },
        }
    }

    pattern.get(p..).is_some_and(|rest| rest.iter().all(|c| *c == '*'))
}
