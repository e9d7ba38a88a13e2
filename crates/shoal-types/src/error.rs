//! Error types for the shoal-types crate.

/// Errors raised when reading a value from a parameter lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    /// The key is absent or its value is null.
    #[error("parameter not found or null: {key}")]
    Missing {
        /// The requested key.
        key: String,
    },

    /// The value exists but cannot be parsed as the requested type.
    #[error("parameter {key} = {value:?} is not a valid {expected}: {reason}")]
    Invalid {
        /// The requested key.
        key: String,
        /// The raw value found.
        value: String,
        /// Name of the type the caller asked for.
        expected: &'static str,
        /// Parser message.
        reason: String,
    },
}
