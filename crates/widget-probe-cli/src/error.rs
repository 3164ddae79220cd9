//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed {
        /// Number of failed scenarios
        failed: usize,
        /// Number of scenarios in the run
        total: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Library error
    #[error("{0}")]
    Probe(#[from] widget_probe::ProbeError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("--jobs must be at least 1");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_scenarios_failed() {
        let err = CliError::ScenariosFailed { failed: 1, total: 3 };
        assert_eq!(err.to_string(), "1 of 3 scenarios failed");
    }

    #[test]
    fn test_probe_error_passes_through() {
        let err: CliError = widget_probe::ProbeError::config("timeouts.action_ms must be greater than 0").into();
        assert_eq!(
            err.to_string(),
            "Configuration error: timeouts.action_ms must be greater than 0"
        );
    }
}
