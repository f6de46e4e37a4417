//! Error types for the service binary.

/// Errors produced while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required env var {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid {name}: {message}")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// What was wrong with its value.
        message: String,
    },
}
